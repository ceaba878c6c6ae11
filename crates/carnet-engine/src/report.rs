//! Run reporting: per-record outcomes and the aggregate summary

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Action decided for one record or one orphaned entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannedAction {
    /// Create a new entry.
    Create,
    /// Update an entry matched by key or email.
    Update,
    /// Reuse an existing unmanaged recipient for this record.
    Adopt,
    /// Hide an orphaned entry.
    Hide,
    /// Delete an orphaned entry.
    Delete,
    /// No usable email candidate on the record.
    SkipMissingEmail,
    /// Every email candidate failed validation.
    SkipInvalidEmail,
    /// The address resolves to a recipient that cannot be reused.
    SkipConflict,
}

impl PlannedAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Adopt => "adopt",
            Self::Hide => "hide",
            Self::Delete => "delete",
            Self::SkipMissingEmail => "skip_missing_email",
            Self::SkipInvalidEmail => "skip_invalid_email",
            Self::SkipConflict => "skip_conflict",
        }
    }
}

impl fmt::Display for PlannedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What was decided for one item, resolved before any mutation.
#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    /// Source line number; absent for removal decisions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub action: PlannedAction,
}

/// Outcome of executing (or previewing) a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Completed,
    Skipped,
    Failed,
}

/// A decision together with its outcome.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedRecord {
    #[serde(flatten)]
    pub decision: Decision,
    pub status: RecordStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ProcessedRecord {
    pub fn completed(decision: Decision) -> Self {
        Self {
            decision,
            status: RecordStatus::Completed,
            detail: None,
        }
    }

    pub fn skipped(decision: Decision, detail: impl Into<String>) -> Self {
        Self {
            decision,
            status: RecordStatus::Skipped,
            detail: Some(detail.into()),
        }
    }

    pub fn failed(decision: Decision, detail: impl Into<String>) -> Self {
        Self {
            decision,
            status: RecordStatus::Failed,
            detail: Some(detail.into()),
        }
    }
}

/// How the dynamic group provisioning ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupOutcome {
    Created,
    Updated,
    Unchanged,
}

impl fmt::Display for GroupOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
        };
        f.write_str(s)
    }
}

/// Aggregate counters for one run, plus the per-item trace.
///
/// Adopted recipients count as updates. In hide mode orphan removals land
/// in `hidden`, in delete mode in `removed`.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub list_id: String,
    /// True when no directory write was executed.
    pub preview: bool,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
    pub hidden: usize,
    pub removed: usize,
    pub conflicts: usize,
    pub skipped_missing_email: usize,
    pub skipped_invalid_email: usize,
    pub failed: usize,
    pub duplicate_keys: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupOutcome>,
    pub records: Vec<ProcessedRecord>,
}

impl RunSummary {
    pub fn new(list_id: impl Into<String>, preview: bool) -> Self {
        Self {
            list_id: list_id.into(),
            preview,
            started_at: Utc::now(),
            finished_at: None,
            processed: 0,
            created: 0,
            updated: 0,
            hidden: 0,
            removed: 0,
            conflicts: 0,
            skipped_missing_email: 0,
            skipped_invalid_email: 0,
            failed: 0,
            duplicate_keys: 0,
            group: None,
            records: Vec::new(),
        }
    }

    /// Record one processed item and bump the matching counters.
    pub fn add(&mut self, record: ProcessedRecord) {
        self.processed += 1;
        match record.status {
            RecordStatus::Failed => self.failed += 1,
            RecordStatus::Completed => match record.decision.action {
                PlannedAction::Create => self.created += 1,
                PlannedAction::Update | PlannedAction::Adopt => self.updated += 1,
                PlannedAction::Hide => self.hidden += 1,
                PlannedAction::Delete => self.removed += 1,
                _ => {}
            },
            RecordStatus::Skipped => match record.decision.action {
                PlannedAction::SkipMissingEmail => self.skipped_missing_email += 1,
                PlannedAction::SkipInvalidEmail => self.skipped_invalid_email += 1,
                PlannedAction::SkipConflict => self.conflicts += 1,
                _ => {}
            },
        }
        self.records.push(record);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.preview { "preview" } else { "apply" };
        writeln!(f, "run summary for list '{}' ({mode}):", self.list_id)?;
        writeln!(f, "  processed:               {}", self.processed)?;
        writeln!(f, "  created:                 {}", self.created)?;
        writeln!(f, "  updated:                 {}", self.updated)?;
        writeln!(f, "  hidden:                  {}", self.hidden)?;
        writeln!(f, "  removed:                 {}", self.removed)?;
        writeln!(f, "  conflicts:               {}", self.conflicts)?;
        writeln!(f, "  skipped (no email):      {}", self.skipped_missing_email)?;
        writeln!(f, "  skipped (invalid email): {}", self.skipped_invalid_email)?;
        writeln!(f, "  failed:                  {}", self.failed)?;
        writeln!(f, "  duplicate identifiers:   {}", self.duplicate_keys)?;
        match self.group {
            Some(outcome) => writeln!(f, "  group:                   {outcome}"),
            None => writeln!(f, "  group:                   not provisioned"),
        }
    }
}
