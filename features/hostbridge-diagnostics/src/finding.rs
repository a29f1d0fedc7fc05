use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    /// Error and Critical findings fail
    /// [Verifier::throw_if_critical](crate::Verifier::throw_if_critical)
    pub fn is_fatal(self) -> bool {
        matches!(self, Severity::Error | Severity::Critical)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
            Severity::Critical => "Critical",
        })
    }
}

/// One result of a check.
///
/// Displays as `{Severity} {Code}: {Message}`, followed by `\nFix: {fix}` when a fix hint is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticFinding {
    code: String,
    severity: Severity,
    message: String,
    fix: Option<String>,
}

impl DiagnosticFinding {
    pub fn new(code: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        DiagnosticFinding {
            code: code.into(),
            severity,
            message: message.into(),
            fix: None,
        }
    }

    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.fix = Some(fix.into());
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn fix(&self) -> Option<&str> {
        self.fix.as_deref()
    }
}

impl fmt::Display for DiagnosticFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.severity, self.code, self.message)?;
        if let Some(fix) = &self.fix {
            write!(f, "\nFix: {fix}")?;
        }
        Ok(())
    }
}
