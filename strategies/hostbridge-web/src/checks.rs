//! Checks for the module pipeline wiring
use hostbridge_core::request::SCOPE_KEY;
use hostbridge_diagnostics::{DiagnosticFinding, Severity};

use crate::{context::RequestContext, modules::RequestScopeModule, pipeline::ModulePipeline};

pub const NO_REQUEST: &str = "HB-WEB-000";
pub const MISSING_SCOPE: &str = "HB-WEB-002";
pub const MISSING_MODULE: &str = "HB-WEB-003";

/// Verifies `pipeline` and, when given, the request currently being served
pub fn verify_web(
    pipeline: &ModulePipeline,
    current: Option<&RequestContext>,
) -> Vec<DiagnosticFinding> {
    let mut findings = Vec::new();

    if !pipeline.contains(RequestScopeModule::NAME) {
        findings.push(
            DiagnosticFinding::new(
                MISSING_MODULE,
                Severity::Warning,
                "The request pipeline has no request scope module; request services fall back to the root.",
            )
            .with_fix("Add RequestScopeModule to the ModulePipeline before other modules."),
        );
    }

    match current {
        Some(request) if !request.items().contains_key(SCOPE_KEY) => findings.push(
            DiagnosticFinding::new(
                MISSING_SCOPE,
                Severity::Error,
                "The current request has no per-request scope.",
            )
            .with_fix("Make sure RequestScopeModule is installed and runs for this request."),
        ),
        Some(_) => {}
        None => findings.push(DiagnosticFinding::new(
            NO_REQUEST,
            Severity::Info,
            "No request in flight during verification (likely at startup). Skipping per-request scope check.",
        )),
    }

    findings
}
