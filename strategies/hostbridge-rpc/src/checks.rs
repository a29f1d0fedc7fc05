//! Checks for the RPC wiring
use hostbridge_core::accessor;
use hostbridge_diagnostics::{DiagnosticFinding, Severity};

use crate::{host::ServiceHost, instance::DiInstanceProvider};

pub const ROOT_MISSING: &str = "HB-RPC-001";
pub const PROVIDER_MISSING: &str = "HB-RPC-002";
pub const HINT: &str = "HB-RPC-INFO";

/// Verifies the root and, for each given host, that every contract resolves through DI
pub fn verify_rpc(hosts: &[&ServiceHost]) -> Vec<DiagnosticFinding> {
    let mut findings = Vec::new();

    if !accessor::is_initialized() {
        findings.push(
            DiagnosticFinding::new(
                ROOT_MISSING,
                Severity::Critical,
                "The HostBridge root container has not been initialized for RPC dispatch.",
            )
            .with_fix(
                "Call hostbridge_core::accessor::initialize(&host) before opening service hosts.",
            ),
        );
    }

    for host in hosts {
        for (contract, runtime) in host.contracts() {
            let uses_di = runtime
                .and_then(|runtime| runtime.instance_provider())
                .is_some_and(|provider| provider.as_any().is::<DiInstanceProvider>());
            if !uses_di {
                findings.push(
                    DiagnosticFinding::new(
                        PROVIDER_MISSING,
                        Severity::Error,
                        format!(
                            "Contract '{}' of service '{}' is not dispatched through the DI instance provider.",
                            contract,
                            host.service()
                        ),
                    )
                    .with_fix("Open the host with ServiceHost::open before dispatching calls."),
                );
            }
        }
    }

    findings.push(
        DiagnosticFinding::new(
            HINT,
            Severity::Info,
            "Ensure every service is hosted by a ServiceHost so DI is applied.",
        )
        .with_fix("Create services through ServiceHost::new(..).add_endpoint(..) and call open()."),
    );

    findings
}
