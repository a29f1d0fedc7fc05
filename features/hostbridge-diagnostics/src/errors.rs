use thiserror::Error;

use crate::finding::DiagnosticFinding;

const BANNER: &str = "HostBridge configuration verification failed:\n\n";

/// Raised by [Verifier::throw_if_critical](crate::Verifier::throw_if_critical),
/// carries every Error and Critical finding
#[derive(Debug, Error)]
#[error("{}", banner(.findings))]
pub struct VerificationFailed {
    pub findings: Vec<DiagnosticFinding>,
}

fn banner(findings: &[DiagnosticFinding]) -> String {
    let listed: Vec<String> = findings.iter().map(ToString::to_string).collect();
    format!("{BANNER}{}", listed.join("\n\n"))
}
