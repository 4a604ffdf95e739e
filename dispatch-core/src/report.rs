//! # Run Report
//!
//! Structured per-request outcomes of one scheduler run, ordered by
//! sequence index regardless of completion order.

use crate::request::{ConfirmationId, TransferRequest};
use serde::Serialize;
use std::fmt;

/// Terminal result of one request going through the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Confirmed {
        confirmation_id: ConfirmationId,
        attempts_made: u32,
    },
    Failed {
        reason: String,
        attempts_made: u32,
    },
}

impl DispatchOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, DispatchOutcome::Confirmed { .. })
    }

    pub fn attempts_made(&self) -> u32 {
        match self {
            DispatchOutcome::Confirmed { attempts_made, .. }
            | DispatchOutcome::Failed { attempts_made, .. } => *attempts_made,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReportEntry {
    pub request: TransferRequest,
    pub outcome: DispatchOutcome,
}

/// Serialized form of one entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRecord {
    pub index: u32,
    pub status: RecordStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Confirmed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub confirmed: usize,
    pub failed: usize,
    pub success_rate: f64,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total: {} | Confirmed: {} | Failed: {} | Success Rate: {:.2}%",
            self.total, self.confirmed, self.failed, self.success_rate
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    entries: Vec<ReportEntry>,
}

impl RunReport {
    /// Builds a report, sorting entries by sequence index.
    pub(crate) fn from_entries(mut entries: Vec<ReportEntry>) -> Self {
        entries.sort_by_key(|e| e.request.sequence_index());
        Self { entries }
    }

    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn outcome(&self, sequence_index: u32) -> Option<&DispatchOutcome> {
        self.entries
            .iter()
            .find(|e| e.request.sequence_index() == sequence_index)
            .map(|e| &e.outcome)
    }

    /// Failed entries, in report order
    pub fn failures(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(|e| !e.outcome.is_confirmed())
    }

    pub fn summary(&self) -> RunSummary {
        let total = self.entries.len();
        let confirmed = self
            .entries
            .iter()
            .filter(|e| e.outcome.is_confirmed())
            .count();
        RunSummary {
            total,
            confirmed,
            failed: total - confirmed,
            success_rate: if total > 0 {
                confirmed as f64 / total as f64 * 100.0
            } else {
                0.0
            },
        }
    }

    pub fn records(&self) -> Vec<ReportRecord> {
        self.entries
            .iter()
            .map(|e| {
                let index = e.request.sequence_index();
                match &e.outcome {
                    DispatchOutcome::Confirmed {
                        confirmation_id,
                        attempts_made,
                    } => ReportRecord {
                        index,
                        status: RecordStatus::Confirmed,
                        confirmation_id: Some(confirmation_id.to_string()),
                        reason: None,
                        attempts: *attempts_made,
                    },
                    DispatchOutcome::Failed {
                        reason,
                        attempts_made,
                    } => ReportRecord {
                        index,
                        status: RecordStatus::Failed,
                        confirmation_id: None,
                        reason: Some(reason.clone()),
                        attempts: *attempts_made,
                    },
                }
            })
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.records())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{StaticSigner, TransferSigner};
    use std::sync::Arc;

    fn entry(index: u32, outcome: DispatchOutcome) -> ReportEntry {
        let signer: Arc<dyn TransferSigner> = Arc::new(StaticSigner::new("src"));
        ReportEntry {
            request: TransferRequest::new(signer, "dst", 5, index).unwrap(),
            outcome,
        }
    }

    fn sample() -> RunReport {
        RunReport::from_entries(vec![
            entry(
                2,
                DispatchOutcome::Failed {
                    reason: "Invalid transfer: bad recipient".to_string(),
                    attempts_made: 1,
                },
            ),
            entry(
                0,
                DispatchOutcome::Confirmed {
                    confirmation_id: ConfirmationId::new("sigA"),
                    attempts_made: 3,
                },
            ),
            entry(
                1,
                DispatchOutcome::Confirmed {
                    confirmation_id: ConfirmationId::new("sigB"),
                    attempts_made: 1,
                },
            ),
        ])
    }

    #[test]
    fn test_entries_sorted_by_index() {
        let report = sample();
        let indices: Vec<u32> = report
            .entries()
            .iter()
            .map(|e| e.request.sequence_index())
            .collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_summary_and_failures() {
        let report = sample();
        let summary = report.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.confirmed, 2);
        assert_eq!(summary.failed, 1);

        let failed: Vec<u32> = report
            .failures()
            .map(|e| e.request.sequence_index())
            .collect();
        assert_eq!(failed, vec![2]);
        assert_eq!(report.outcome(0).map(|o| o.attempts_made()), Some(3));
    }

    #[test]
    fn test_json_shape() {
        let json = sample().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value[0]["index"], 0);
        assert_eq!(value[0]["status"], "confirmed");
        assert_eq!(value[0]["confirmationId"], "sigA");
        assert_eq!(value[0]["attempts"], 3);
        assert!(value[0].get("reason").is_none());

        assert_eq!(value[2]["status"], "failed");
        assert_eq!(value[2]["reason"], "Invalid transfer: bad recipient");
        assert!(value[2].get("confirmationId").is_none());
    }
}
