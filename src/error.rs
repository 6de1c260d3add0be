//! Application error type.
//!
//! Every fallible operation in the crate returns `Result<_, AppError>`. The
//! error carries the process exit code the `curvefit` binary should use:
//!
//! - `2`: invalid input, configuration, or I/O failure
//! - `3`: no usable data (empty or inconsistent dataset)
//! - `4`: the search could not produce a valid fit

/// Exit code for invalid input/config and I/O failures.
pub const EXIT_INPUT: u8 = 2;
/// Exit code for empty or inconsistent datasets.
pub const EXIT_NO_DATA: u8 = 3;
/// Exit code for a search that produced no valid candidate.
pub const EXIT_FIT: u8 = 4;

#[derive(Clone, PartialEq, Eq)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::new(EXIT_INPUT, message)
    }

    pub fn no_data(message: impl Into<String>) -> Self {
        Self::new(EXIT_NO_DATA, message)
    }

    pub fn fit(message: impl Into<String>) -> Self {
        Self::new(EXIT_FIT, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
