//! Outcome of a sync pass

use serde::Serialize;

/// Reported when a pass is requested while another is still running
pub const SYNC_IN_PROGRESS: &str = "sync already in progress";

/// Result of one push-then-pull pass. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Records accepted by the remote service
    pub pushed: usize,
    /// Remote rows inserted locally
    pub pulled: usize,
    /// One entry per failed collection (or one for a pass that never started)
    pub errors: Vec<String>,
}

impl SyncReport {
    pub(crate) fn aborted(reason: impl Into<String>) -> Self {
        Self {
            errors: vec![reason.into()],
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub(crate) fn absorb_push(&mut self, outcome: PhaseOutcome) {
        self.pushed += outcome.count;
        self.errors.extend(outcome.errors);
    }

    pub(crate) fn absorb_pull(&mut self, outcome: PhaseOutcome) {
        self.pulled += outcome.count;
        self.errors.extend(outcome.errors);
    }
}

/// Aggregate of one phase (push or pull) across every collection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhaseOutcome {
    pub count: usize,
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn absorbs_both_phases() {
        let mut report = SyncReport::default();
        report.absorb_push(PhaseOutcome {
            count: 2,
            errors: vec!["sleepLogs: push failed: boom".to_string()],
        });
        report.absorb_pull(PhaseOutcome {
            count: 3,
            errors: Vec::new(),
        });

        assert_eq!(
            report,
            SyncReport {
                pushed: 2,
                pulled: 3,
                errors: vec!["sleepLogs: push failed: boom".to_string()],
            }
        );
        assert!(!report.is_clean());
    }

    #[test]
    fn serializes_as_flat_json() {
        let report = SyncReport::aborted(SYNC_IN_PROGRESS);
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            serde_json::json!({
                "pushed": 0,
                "pulled": 0,
                "errors": ["sync already in progress"]
            })
        );
    }
}
