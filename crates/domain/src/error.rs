//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`FallDetectError`] at port boundaries via `From`.

/// Top-level error crossing port boundaries.
#[derive(Debug, thiserror::Error)]
pub enum FallDetectError {
    /// A value failed domain validation.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// A persistence backend failed.
    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Handing an event to an outbound channel failed.
    #[error("delivery error")]
    Delivery(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Domain validation failures.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    /// An identifier was empty or whitespace only.
    #[error("identifier must not be empty")]
    EmptyId,

    /// An account cannot be linked to itself.
    #[error("cannot link account {0} to itself")]
    SelfLink(String),

    /// The configured target device name was empty.
    #[error("target device name must not be empty")]
    EmptyTargetName,
}

/// Why a raw notification could not be turned into a fall event.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    /// The payload was not valid UTF-8.
    #[error("payload is not valid UTF-8")]
    InvalidUtf8,

    /// The payload does not start with the `FALL:` prefix.
    #[error("payload is missing the FALL: prefix")]
    MissingPrefix,

    /// The payload does not carry exactly two colon-separated fields.
    #[error("expected 2 fields after the prefix, got {count}")]
    MalformedFields {
        /// Number of fields actually found.
        count: usize,
    },

    /// A field was empty after trimming.
    #[error("{field} field is empty")]
    EmptyField {
        /// Name of the empty field (`"type"` or `"severity"`).
        field: &'static str,
    },
}
