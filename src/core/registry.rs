//! Account and instance registry.
//!
//! Built once by the composition root, then passed by reference to every
//! generator. Lookups are linear scans over insertion-ordered vectors; the
//! order is visible in generated output.

use crate::config::{Account, Instance};
use crate::error::{Error, Result};
use crate::policy::Policies;
use crate::toolkit::Toolkit;

#[derive(Debug)]
pub struct Registry<A> {
    accounts: Vec<Account>,
    instances: Vec<Instance<A>>,
    policies: Policies<A>,
    toolkit: Toolkit,
}

impl<A> Default for Registry<A> {
    fn default() -> Self {
        Self::new(Policies::default())
    }
}

impl<A> Registry<A> {
    pub fn new(policies: Policies<A>) -> Self {
        Self {
            accounts: Vec::new(),
            instances: Vec::new(),
            policies,
            toolkit: Toolkit::default(),
        }
    }

    pub fn with_toolkit(mut self, toolkit: Toolkit) -> Self {
        self.toolkit = toolkit;
        self
    }

    pub fn policies(&self) -> &Policies<A> {
        &self.policies
    }

    pub fn toolkit(&self) -> &Toolkit {
        &self.toolkit
    }

    pub fn add_account(&mut self, account: Account) -> Result<()> {
        if self.accounts.iter().any(|a| a.name == account.name) {
            return Err(Error::duplicate_account(account.name));
        }
        self.accounts.push(account);
        Ok(())
    }

    /// The referenced account does not have to exist yet.
    pub fn add_instance(&mut self, instance: Instance<A>) -> Result<()> {
        let taken = self
            .instances
            .iter()
            .any(|i| i.account_name == instance.account_name && i.suffix() == instance.suffix());
        if taken {
            return Err(Error::duplicate_instance(
                instance.account_name.clone(),
                instance.suffix(),
            ));
        }
        self.instances.push(instance);
        Ok(())
    }

    pub fn get_account(&self, name: &str) -> Result<&Account> {
        self.accounts
            .iter()
            .find(|a| a.name == name)
            .ok_or_else(|| Error::account_not_found(name))
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn instances(&self) -> &[Instance<A>] {
        &self.instances
    }

    pub fn account_names(&self) -> Vec<&str> {
        self.accounts.iter().map(|a| a.name.as_str()).collect()
    }

    /// Fails when the account is unknown, even if no instance would match.
    pub fn instances_for_account(&self, account_name: &str) -> Result<Vec<&Instance<A>>> {
        let account = self.get_account(account_name)?;
        Ok(self
            .instances
            .iter()
            .filter(|i| i.account_name == account.name)
            .collect())
    }

    pub fn instance_for_account(&self, account_name: &str, suffix: Option<&str>) -> Result<&Instance<A>> {
        self.instances_for_account(account_name)?
            .into_iter()
            .find(|i| i.suffix() == suffix)
            .ok_or_else(|| Error::instance_not_found(account_name, suffix))
    }

    pub fn instance_for_account_if_exists(
        &self,
        account_name: &str,
        suffix: Option<&str>,
    ) -> Option<&Instance<A>> {
        self.instance_for_account(account_name, suffix).ok()
    }
}
