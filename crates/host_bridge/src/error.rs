//! Error taxonomy for outbound calls, inbound decoding, and launch payload parsing.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Failures surfaced synchronously to callers of bridge and component operations.
pub enum BridgeError {
    /// Caller input was malformed or out of range.
    #[error("invalid {field}: {reason}")]
    Validation {
        /// Stable name of the rejected input.
        field: &'static str,
        /// Human-readable rejection reason.
        reason: String,
    },
    /// The running host version is lower than the capability requires.
    #[error("host version {running} does not support this method (requires {required})")]
    Precondition {
        /// Minimum version the capability needs.
        required: String,
        /// Version reported by the running host.
        running: String,
    },
    /// The operation is already in progress and cannot be started again.
    #[error("{operation} is already in progress")]
    DuplicateOperation {
        /// Stable name of the operation.
        operation: &'static str,
    },
    /// No outbound channel could be determined, or the selected channel rejected the message.
    #[error("no outbound transport available: {reason}")]
    TransportUnavailable {
        /// Diagnostic reason.
        reason: String,
    },
    /// The pending reply slot was dropped before the host answered.
    #[error("pending reply was abandoned before the host answered")]
    ReplyAbandoned,
}

impl BridgeError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn transport(reason: impl Into<String>) -> Self {
        Self::TransportUnavailable {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Inbound frame or payload did not match the schema expected for its event name.
///
/// Decode errors never reach application code; the bridge drops the frame.
pub enum DecodeError {
    /// The raw message was not a JSON document.
    #[error("frame is not valid JSON: {0}")]
    Json(String),
    /// The frame envelope was not `{eventType: string, eventData: string}`.
    #[error("frame envelope has unexpected shape: {0}")]
    Envelope(String),
    /// A known event carried a payload of the wrong shape.
    #[error("payload of `{event}` has unexpected shape: {reason}")]
    Payload {
        /// Event name the payload arrived under.
        event: String,
        /// Mismatch description.
        reason: String,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Launch payload parsing failures.
pub enum LaunchDataError {
    /// A required field was absent.
    #[error("launch data is missing `{0}`")]
    MissingField(&'static str),
    /// A field was present but could not be decoded.
    #[error("launch data field `{field}` is invalid: {reason}")]
    InvalidField {
        /// Wire name of the field.
        field: &'static str,
        /// Decoding failure description.
        reason: String,
    },
}
