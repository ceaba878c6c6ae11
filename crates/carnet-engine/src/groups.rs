//! Dynamic distribution group provisioning

use tracing::info;

use carnet_directory::entry::DynamicGroupSpec;
use carnet_directory::error::DirectoryError;
use carnet_directory::filter::GroupFilter;
use carnet_directory::traits::Directory;

use crate::error::{EngineError, EngineResult};
use crate::options::RunOptions;
use crate::report::GroupOutcome;

/// Name of the dynamic group serving a list.
pub fn group_name(list_id: &str) -> String {
    format!("Contacts-{list_id}")
}

/// Mail alias of the group, an ASCII slug of the list identity.
///
/// Characters outside `[a-z0-9]` become hyphens, runs are collapsed and
/// edges trimmed. Falls back to plain `contacts` when nothing survives.
pub fn group_alias(list_id: &str) -> String {
    let mut slug = String::with_capacity(list_id.len());
    let mut last_hyphen = true;
    for c in list_id.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            last_hyphen = false;
        } else if !last_hyphen {
            slug.push('-');
            last_hyphen = true;
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "contacts".to_string()
    } else {
        format!("contacts-{slug}")
    }
}

/// Ensures the per-list dynamic group exists, filters on the list
/// identity, and is visible.
///
/// Any directory failure here is fatal for the run: the group lookup is
/// the first remote interaction and doubles as the connectivity check for
/// the write path.
pub struct GroupProvisioner<'a> {
    directory: &'a dyn Directory,
    list_id: &'a str,
    mail_domain: Option<&'a str>,
    apply: bool,
}

impl<'a> GroupProvisioner<'a> {
    pub fn new(directory: &'a dyn Directory, options: &'a RunOptions) -> Self {
        Self {
            directory,
            list_id: &options.list_id,
            mail_domain: options.mail_domain.as_deref(),
            apply: options.apply,
        }
    }

    pub async fn ensure(&self) -> EngineResult<GroupOutcome> {
        let name = group_name(self.list_id);
        let filter = GroupFilter::list_scope(self.list_id);

        let existing = self
            .directory
            .find_group(&name)
            .await
            .map_err(|e| self.fatal(e))?;

        let Some(group) = existing else {
            let mut spec = DynamicGroupSpec::new(&name, filter);
            if let Some(domain) = self.mail_domain {
                let alias = group_alias(self.list_id);
                let address = format!("{alias}@{domain}");
                spec = spec.with_address(alias, address);
            }
            if self.apply {
                let id = self
                    .directory
                    .create_group(&spec)
                    .await
                    .map_err(|e| self.fatal(e))?;
                info!(group = %name, id = %id, "created dynamic distribution group");
            } else {
                info!(group = %name, "would create dynamic distribution group");
            }
            return Ok(GroupOutcome::Created);
        };

        let mut outcome = GroupOutcome::Unchanged;

        if group.filter != filter {
            if self.apply {
                self.directory
                    .update_group_filter(&group.id, &filter)
                    .await
                    .map_err(|e| self.fatal(e))?;
                info!(group = %name, "updated group membership filter");
            } else {
                info!(group = %name, "would update group membership filter");
            }
            outcome = GroupOutcome::Updated;
        }

        if group.hidden {
            if self.apply {
                self.directory
                    .set_group_visibility(&group.id, false)
                    .await
                    .map_err(|e| self.fatal(e))?;
                info!(group = %name, "unhid dynamic distribution group");
            } else {
                info!(group = %name, "would unhide dynamic distribution group");
            }
            outcome = GroupOutcome::Updated;
        }

        Ok(outcome)
    }

    fn fatal(&self, source: DirectoryError) -> EngineError {
        EngineError::GroupProvisioning {
            list: self.list_id.to_string(),
            source,
        }
    }
}
