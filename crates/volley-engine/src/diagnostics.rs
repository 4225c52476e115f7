//! Caller-facing diagnostics for resource creation.
//!
//! Creation calls that can produce non-fatal findings (layout validation,
//! shader checks) accept a [`Report`] callback. Every diagnostic is also
//! forwarded to the `log` facade, so passing `None` loses nothing but the
//! programmatic hook.

use core::fmt;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Severity {
    /// Creation continues on a best-effort basis.
    Warning,
    /// Creation failed; an invalid handle is returned.
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Warning => write!(f, "warning: {}", self.message),
            Severity::Error => write!(f, "error: {}", self.message),
        }
    }
}

/// Optional diagnostic callback.
pub type Report<'a> = Option<&'a mut dyn FnMut(&Diagnostic)>;

/// Logs `diagnostic` and hands it to the callback, if any.
pub fn emit(report: &mut Report<'_>, diagnostic: Diagnostic) {
    match diagnostic.severity {
        Severity::Warning => log::warn!("{}", diagnostic.message),
        Severity::Error => log::error!("{}", diagnostic.message),
    }
    if let Some(callback) = report {
        callback(&diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_forwards_to_callback() {
        let mut seen = Vec::new();
        let mut sink = |d: &Diagnostic| seen.push(d.clone());
        let mut report: Report<'_> = Some(&mut sink);
        emit(&mut report, Diagnostic::warning("layout mismatch"));
        emit(&mut report, Diagnostic::error("boom"));
        drop(report);
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].severity, Severity::Warning);
        assert_eq!(seen[1].to_string(), "error: boom");
    }

    #[test]
    fn emit_without_callback_is_fine() {
        let mut report: Report<'_> = None;
        emit(&mut report, Diagnostic::warning("ignored"));
    }
}
