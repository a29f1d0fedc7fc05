//! Checks for the pipeline independent parts
use hostbridge_core::accessor;

use crate::{DiagnosticFinding, Severity};

pub const ROOT_MISSING: &str = "HB-CORE-001";

/// Reports a missing root container
pub fn verify_core() -> Vec<DiagnosticFinding> {
    if accessor::is_initialized() {
        return Vec::new();
    }

    vec![DiagnosticFinding::new(
        ROOT_MISSING,
        Severity::Critical,
        "The HostBridge root container has not been initialized.",
    )
    .with_fix("Call hostbridge_core::accessor::initialize(&host) after building the host.")]
}
