//! String template rendering utilities.

/// Replace every `{{key}}` in `template` with its value.
///
/// Keys without a value are left untouched so callers can detect them.
pub fn render(template: &str, variables: &[(&str, &str)]) -> String {
    let mut result = template.to_string();

    for (key, value) in variables {
        let placeholder = format!("{{{{{}}}}}", key);
        result = result.replace(&placeholder, value);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_replaces_all_occurrences() {
        assert_eq!(
            render("{{account}}/{{account}}", &[("account", "acct1")]),
            "acct1/acct1"
        );
    }

    #[test]
    fn render_leaves_unknown_keys() {
        assert_eq!(render("{{region}}", &[("account", "acct1")]), "{{region}}");
    }
}
