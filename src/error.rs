//! Error types for badge rendering and print dispatch.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Everything that can stop a badge from reaching the printer.
///
/// Text that does not fit its box is not an error: the layout engine
/// truncates with a marker and flags the field instead.
#[derive(Debug, Error)]
pub enum BadgeError {
    /// The drawing or QR-code collaborator failed; no badge was produced.
    #[error("Render failed: {0}")]
    Render(String),

    /// The requested printer is not among the enumerated printers.
    #[error("Printer not found: {name}")]
    PrinterNotFound { name: String },

    /// The platform print mechanism reported non-success.
    #[error("Print submission to '{printer}' failed: {message}")]
    PrintSubmissionFailed { printer: String, message: String },

    /// The printer query itself failed.
    #[error("Printer enumeration failed: {0}")]
    Enumeration(String),

    /// Output directory or document write failure.
    #[error("Filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A call across the print-subsystem boundary exceeded its deadline.
    ///
    /// The caller stops waiting but the platform call is not recalled: a
    /// submission that times out may still have been queued and can print.
    #[error("Timeout after {:?}: {operation}", after)]
    Timeout { operation: String, after: Duration },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// An attendee payload could not be parsed.
    #[error("Invalid attendee payload: {0}")]
    InvalidPayload(String),
}

impl BadgeError {
    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn submission(printer: &str, message: impl Into<String>) -> Self {
        Self::PrintSubmissionFailed {
            printer: printer.to_string(),
            message: message.into(),
        }
    }
}

/// Result type for badge operations
pub type BadgeResult<T> = Result<T, BadgeError>;
