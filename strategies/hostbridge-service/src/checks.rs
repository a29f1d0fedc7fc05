//! Checks for service hosting
use hostbridge_diagnostics::{DiagnosticFinding, Severity};

pub const CONSOLE_MODE: &str = "HB-SVC-INFO";

pub fn verify_service(running_as_service: bool) -> Vec<DiagnosticFinding> {
    if running_as_service {
        return Vec::new();
    }
    vec![DiagnosticFinding::new(
        CONSOLE_MODE,
        Severity::Info,
        "Running in console/debug mode; service manager checks skipped.",
    )
    .with_fix("When installed as a service, on_stop/on_shutdown must stop and dispose the host.")]
}
