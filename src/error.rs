/*!

The crate's error type. Every fallible operation returns [`Result<T>`], and nothing is
recovered internally: a malformed scenario aborts a run before the first patient is
simulated, and a broken internal contract aborts it wherever it is detected.

*/

use std::fmt::{self, Display};
use std::io;

#[derive(Debug)]
pub enum MicrosimError {
    /// A scenario, state space, or rate matrix failed validation. `location` names the
    /// offending row, entry, or field, e.g. `"rate[3][5]"` or `"annual_state_costs"`.
    Configuration { location: String, message: String },
    /// An internal contract was broken (time running backwards in accrual, a repeated
    /// patient id, ...). This is a programming error, not a data error.
    InvariantViolation(String),
    IoError(io::Error),
    JsonError(serde_json::Error),
    CsvError(csv::Error),
}

impl MicrosimError {
    pub(crate) fn configuration(location: impl Into<String>, message: impl Into<String>) -> Self {
        MicrosimError::Configuration {
            location: location.into(),
            message: message.into(),
        }
    }

    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        MicrosimError::InvariantViolation(message.into())
    }

    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, MicrosimError::Configuration { .. })
    }

    #[must_use]
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, MicrosimError::InvariantViolation(_))
    }
}

impl From<io::Error> for MicrosimError {
    fn from(error: io::Error) -> Self {
        MicrosimError::IoError(error)
    }
}

impl From<serde_json::Error> for MicrosimError {
    fn from(error: serde_json::Error) -> Self {
        MicrosimError::JsonError(error)
    }
}

impl From<csv::Error> for MicrosimError {
    fn from(error: csv::Error) -> Self {
        MicrosimError::CsvError(error)
    }
}

impl std::error::Error for MicrosimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MicrosimError::IoError(error) => Some(error),
            MicrosimError::JsonError(error) => Some(error),
            MicrosimError::CsvError(error) => Some(error),
            _ => None,
        }
    }
}

impl Display for MicrosimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MicrosimError::Configuration { location, message } => {
                write!(f, "configuration error at {location}: {message}")
            }
            MicrosimError::InvariantViolation(message) => {
                write!(f, "invariant violation: {message}")
            }
            MicrosimError::IoError(error) => write!(f, "I/O error: {error}"),
            MicrosimError::JsonError(error) => write!(f, "JSON error: {error}"),
            MicrosimError::CsvError(error) => write!(f, "CSV error: {error}"),
        }
    }
}

pub type Result<T> = std::result::Result<T, MicrosimError>;
