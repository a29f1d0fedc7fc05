use std::{
    any::Any,
    error::Error,
    fmt::Display,
    panic::{catch_unwind, AssertUnwindSafe},
};

use crate::{
    errors::VerificationFailed,
    finding::{DiagnosticFinding, Severity},
};

/// Code of the finding that replaces a failed check
pub const CRASH_CODE: &str = "HB000";

type Check = Box<dyn Fn() -> Vec<DiagnosticFinding> + Send + Sync>;

/// What a check may return.
///
/// `None` counts as no findings, an `Err` is reported as a crash of the check.
pub trait CheckOutput {
    fn into_findings(self) -> Result<Vec<DiagnosticFinding>, String>;
}

impl CheckOutput for Vec<DiagnosticFinding> {
    fn into_findings(self) -> Result<Vec<DiagnosticFinding>, String> {
        Ok(self)
    }
}

impl CheckOutput for Option<Vec<DiagnosticFinding>> {
    fn into_findings(self) -> Result<Vec<DiagnosticFinding>, String> {
        Ok(self.unwrap_or_default())
    }
}

impl<T, E> CheckOutput for Result<T, E>
where
    T: CheckOutput,
    E: Into<Box<dyn Error + Send + Sync>>,
{
    fn into_findings(self) -> Result<Vec<DiagnosticFinding>, String> {
        match self {
            Ok(output) => output.into_findings(),
            Err(e) => Err(innermost(e.into().as_ref()).to_string()),
        }
    }
}

/// Reports the root cause of an error chain
fn innermost<'a>(mut error: &'a (dyn Error + 'static)) -> &'a (dyn Error + 'static) {
    while let Some(source) = error.source() {
        error = source;
    }
    error
}

/// An ordered set of checks
#[derive(Default)]
pub struct Verifier {
    checks: Vec<Check>,
}

impl Verifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<F, O>(mut self, check: F) -> Self
    where
        F: Fn() -> O + Send + Sync + 'static,
        O: CheckOutput,
    {
        self.checks.push(Box::new(move || {
            let outcome = catch_unwind(AssertUnwindSafe(&check))
                .map_err(|panic| panic_message(panic.as_ref()))
                .and_then(CheckOutput::into_findings);
            match outcome {
                Ok(findings) => findings,
                Err(message) => vec![crashed(message)],
            }
        }));
        self
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Runs every check in order. A failing check becomes one Error finding, the others still run.
    pub fn run(&self) -> Vec<DiagnosticFinding> {
        self.checks.iter().flat_map(|check| check()).collect()
    }

    /// Fails when any check reports an Error or Critical finding
    pub fn throw_if_critical(&self) -> Result<(), VerificationFailed> {
        let findings: Vec<DiagnosticFinding> = self
            .run()
            .into_iter()
            .filter(|finding| finding.severity().is_fatal())
            .collect();

        match findings.is_empty() {
            true => Ok(()),
            false => Err(VerificationFailed { findings }),
        }
    }

    /// Emits every finding as a log event at the matching level
    pub fn log(&self) {
        for finding in self.run() {
            match finding.severity() {
                Severity::Info => tracing::info!(code = finding.code(), "{}", finding),
                Severity::Warning => tracing::warn!(code = finding.code(), "{}", finding),
                Severity::Error => tracing::error!(code = finding.code(), "{}", finding),
                Severity::Critical => {
                    tracing::error!(code = finding.code(), critical = true, "{}", finding)
                }
            }
        }
    }
}

fn crashed(message: impl Display) -> DiagnosticFinding {
    DiagnosticFinding::new(
        CRASH_CODE,
        Severity::Error,
        format!("Verifier crashed: {message}"),
    )
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "check panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    fn info(code: &str) -> DiagnosticFinding {
        DiagnosticFinding::new(code, Severity::Info, "fine")
    }

    #[test]
    fn none_counts_as_no_findings() {
        let verifier = Verifier::new().add(|| -> Option<Vec<DiagnosticFinding>> { None });
        assert!(verifier.run().is_empty());
    }

    #[test]
    fn failing_check_becomes_one_error_and_others_still_run() {
        let verifier = Verifier::new()
            .add(|| -> Result<Vec<DiagnosticFinding>, io::Error> {
                Err(io::Error::other("disk on fire"))
            })
            .add(|| vec![info("HB-OK")]);

        let findings = verifier.run();
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].code(), CRASH_CODE);
        assert_eq!(findings[0].severity(), Severity::Error);
        assert_eq!(findings[0].message(), "Verifier crashed: disk on fire");
        assert_eq!(findings[1].code(), "HB-OK");
    }

    #[test]
    fn panicking_check_is_contained() {
        let verifier = Verifier::new().add(|| -> Vec<DiagnosticFinding> { panic!("boom") });

        let findings = verifier.run();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].message(), "Verifier crashed: boom");
    }

    #[test]
    fn crash_reports_the_root_cause() {
        #[derive(Debug, thiserror::Error)]
        #[error("outer")]
        struct Outer(#[source] io::Error);

        let verifier = Verifier::new().add(|| -> Result<Vec<DiagnosticFinding>, Outer> {
            Err(Outer(io::Error::other("inner cause")))
        });

        assert_eq!(verifier.run()[0].message(), "Verifier crashed: inner cause");
    }

    #[test]
    fn only_error_and_critical_are_fatal() {
        let verifier = Verifier::new().add(|| {
            vec![
                DiagnosticFinding::new("HB-W", Severity::Warning, "meh"),
                DiagnosticFinding::new("HB-E", Severity::Error, "broken").with_fix("repair it"),
            ]
        });

        let failure = verifier.throw_if_critical().unwrap_err();
        let message = failure.to_string();
        assert!(message.starts_with("HostBridge configuration verification failed:\n\n"));
        assert!(message.contains("Error HB-E: broken\nFix: repair it"));
        assert!(!message.contains("HB-W"));
        assert_eq!(failure.findings.len(), 1);
    }

    #[test]
    fn warnings_alone_pass() {
        let verifier = Verifier::new()
            .add(|| vec![DiagnosticFinding::new("HB-W", Severity::Warning, "meh")]);
        assert!(verifier.throw_if_critical().is_ok());
    }
}
