//! Run options

use crate::removal::RemovalMode;

/// Options controlling a reconciliation run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// List identity the batch belongs to.
    pub list_id: String,
    /// Execute directory writes. When false the run is a preview that
    /// walks the same decision path without mutating anything.
    pub apply: bool,
    /// Plan removals for entries of this list absent from the batch.
    pub prune: bool,
    /// Delete orphaned entries instead of hiding them.
    pub hard_delete: bool,
    /// Ensure the dynamic distribution group for this list.
    pub provision_group: bool,
    /// Mail domain for the group address. Without one the group gets no
    /// address of its own.
    pub mail_domain: Option<String>,
}

impl RunOptions {
    /// Preview-mode options for a list, group provisioning on.
    pub fn new(list_id: impl Into<String>) -> Self {
        Self {
            list_id: list_id.into(),
            apply: false,
            prune: false,
            hard_delete: false,
            provision_group: true,
            mail_domain: None,
        }
    }

    #[must_use]
    pub fn with_apply(mut self, apply: bool) -> Self {
        self.apply = apply;
        self
    }

    #[must_use]
    pub fn with_prune(mut self, prune: bool) -> Self {
        self.prune = prune;
        self
    }

    #[must_use]
    pub fn with_hard_delete(mut self, hard_delete: bool) -> Self {
        self.hard_delete = hard_delete;
        self
    }

    #[must_use]
    pub fn with_group(mut self, provision_group: bool) -> Self {
        self.provision_group = provision_group;
        self
    }

    #[must_use]
    pub fn with_mail_domain(mut self, domain: Option<String>) -> Self {
        self.mail_domain = domain;
        self
    }

    pub fn removal_mode(&self) -> RemovalMode {
        if self.hard_delete {
            RemovalMode::Delete
        } else {
            RemovalMode::Hide
        }
    }
}
