//! Domain entities for the bulk-operation pipeline.
//!
//! A bulk job applies one target value (a new price) to a fixed list of
//! remote variant identifiers, batch by batch, through the admin API.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Most per-item error strings kept on a job record; the rest are counted.
pub const MAX_DIGEST_ENTRIES: usize = 5;

/// Job status enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Success,
    Failed,
}

impl JobStatus {
    /// Terminal states admit no further processing (only an explicit retry).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Success => write!(f, "success"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "success" => Ok(JobStatus::Success),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(format!("Invalid job status: {}", s)),
        }
    }
}

/// Size-bounded summary of per-item failures.
///
/// Keeps the status payload small regardless of how many items failed:
/// at most [`MAX_DIGEST_ENTRIES`] strings plus a count of suppressed ones.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorDigest {
    entries: Vec<String>,
    suppressed: u32,
}

impl ErrorDigest {
    pub fn push(&mut self, entry: String) {
        if self.entries.len() < MAX_DIGEST_ENTRIES {
            self.entries.push(entry);
        } else {
            self.suppressed += 1;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.suppressed == 0
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn suppressed(&self) -> u32 {
        self.suppressed
    }

    /// Human-readable rendering for the status payload.
    pub fn summary(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        let mut out = self.entries.join("; ");
        if self.suppressed > 0 {
            out.push_str(&format!(" ... and {} more errors", self.suppressed));
        }
        out
    }
}

/// A unit of bulk work: one tenant, a fixed item list, one target value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkJob {
    pub id: Uuid,
    pub tenant: String,
    /// Variant identifiers, fixed at creation and never mutated afterwards.
    pub item_ids: Vec<String>,
    pub target_value: String,
    pub status: JobStatus,
    pub processed_count: u32,
    pub total_count: u32,
    pub error_digest: ErrorDigest,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl BulkJob {
    pub fn new(tenant: &str, item_ids: Vec<String>, target_value: &str) -> Self {
        let now = Utc::now();
        let total_count = item_ids.len() as u32;
        Self {
            id: Uuid::new_v4(),
            tenant: tenant.to_string(),
            item_ids,
            target_value: target_value.to_string(),
            status: JobStatus::Pending,
            processed_count: 0,
            total_count,
            error_digest: ErrorDigest::default(),
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Progress as a whole percentage; item lists are non-empty by contract.
    pub fn percent_complete(&self) -> u32 {
        if self.total_count == 0 {
            return 100;
        }
        ((self.processed_count as f64 / self.total_count as f64) * 100.0).round() as u32
    }
}

/// Per-item transport failure within one batch.
#[derive(Debug, Clone)]
pub struct ItemTransportError {
    pub item_id: String,
    pub message: String,
}

/// Per-item validation failure reported by the admin API.
#[derive(Debug, Clone)]
pub struct ItemValidationError {
    pub item_id: String,
    pub field: Option<String>,
    pub message: String,
}

/// Outcome of one batch of per-item calls. Ephemeral, never persisted.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub success_count: u32,
    pub failure_count: u32,
    pub transport_errors: Vec<ItemTransportError>,
    pub validation_errors: Vec<ItemValidationError>,
}

impl BatchResult {
    pub fn record_success(&mut self) {
        self.success_count += 1;
    }

    pub fn record_transport_failure(&mut self, item_id: &str, message: String) {
        self.failure_count += 1;
        self.transport_errors.push(ItemTransportError {
            item_id: item_id.to_string(),
            message,
        });
    }

    pub fn record_validation_failure(
        &mut self,
        item_id: &str,
        field: Option<String>,
        message: String,
    ) {
        self.failure_count += 1;
        self.validation_errors.push(ItemValidationError {
            item_id: item_id.to_string(),
            field,
            message,
        });
    }

    /// Mark every item of a batch as failed with one shared cause; used when
    /// the whole batch call blew up before reaching per-item handling.
    pub fn full_failure(item_ids: &[String], message: &str) -> Self {
        let mut result = Self::default();
        for item_id in item_ids {
            result.record_transport_failure(item_id, message.to_string());
        }
        result
    }
}
