use tracing::{error, warn};

use crate::error::{Severity, ShaderError};

/// Which failures a program reports through `tracing`.
///
/// Failures are always returned to the caller (as `false`/`None`); this only controls
/// whether they are also logged. Both switches default to off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// Log load/creation failures and stream-output misuse at `error` level.
    pub report_errors: bool,
    /// Log lookup misses and size mismatches at `warn` level.
    pub report_warnings: bool,
}

impl Diagnostics {
    /// Reports nothing.
    pub const QUIET: Self = Self {
        report_errors: false,
        report_warnings: false,
    };

    /// Reports everything.
    pub const VERBOSE: Self = Self {
        report_errors: true,
        report_warnings: true,
    };

    /// Reads `BINDERY_REPORT_ERRORS` and `BINDERY_REPORT_WARNINGS`.
    pub fn from_env() -> Self {
        Self {
            report_errors: env_var_truthy("BINDERY_REPORT_ERRORS"),
            report_warnings: env_var_truthy("BINDERY_REPORT_WARNINGS"),
        }
    }

    pub(crate) fn report(&self, err: &ShaderError) {
        self.report_as(err.severity(), err);
    }

    pub(crate) fn report_as(&self, severity: Severity, err: &ShaderError) {
        match severity {
            Severity::Error if self.report_errors => error!(error = %err, "shader program error"),
            Severity::Warning if self.report_warnings => {
                warn!(error = %err, "shader program warning")
            }
            _ => {}
        }
    }
}

fn env_var_truthy(name: &str) -> bool {
    let Ok(raw) = std::env::var(name) else {
        return false;
    };
    truthy(&raw)
}

fn truthy(raw: &str) -> bool {
    let v = raw.trim();
    v == "1"
        || v.eq_ignore_ascii_case("true")
        || v.eq_ignore_ascii_case("yes")
        || v.eq_ignore_ascii_case("on")
}
