use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ReconciliationSummary {
    pub scanned: usize,
    pub downgraded: usize,
    /// Tenants another run downgraded between our scan and our write.
    pub skipped: usize,
    pub interrupted: bool,
    /// The expired-tenant query itself failed, so nothing was scanned.
    #[serde(skip)]
    pub scan_failed: bool,
    pub errors: Vec<String>,
}

impl ReconciliationSummary {
    /// Per-tenant failures are reported in `errors` without failing the run.
    pub fn is_success(&self) -> bool {
        !self.interrupted && !self.scan_failed
    }
}
