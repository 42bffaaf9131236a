//! Error taxonomy for the ClipShare client core (spec §7).
//!
//! Every fallible core operation returns a [`ClipShareError`]. The negotiator
//! maps each variant to a [`crate::status::StatusCode`] exactly once per
//! request (see [`crate::status::Reporter`]).

use thiserror::Error;

use crate::status::StatusCode;

#[derive(Debug, Error)]
pub enum ClipShareError {
    #[error("nothing to send or no data available")]
    NoData,

    #[error("malformed size, invalid UTF-8, bad filename, or oversized payload: {0}")]
    DataError(String),

    #[error("server rejected the method: {0}")]
    MethodNotAllowed(String),

    #[error("method {0} is not valid for the negotiated protocol version")]
    ProtoMethodError(u8),

    #[error("protocol version negotiation failed: {0}")]
    ProtoVersionMismatch(String),

    #[error("peer returned an undefined status byte: {0}")]
    ServerError(String),

    #[error("socket read/write failed or timed out: {0}")]
    CommunicationFailure(#[from] std::io::Error),

    #[error("connect or TLS handshake failed: {0}")]
    ConnectionFailure(String),

    #[error("caller-supplied address is not a valid IPv4 dotted quad: {0}")]
    InvalidAddress(String),

    #[error("filesystem or clipboard adapter failed: {0}")]
    LocalError(String),
}

impl ClipShareError {
    /// Maps this error to the status reported to the caller (spec §7).
    pub fn status_code(&self) -> StatusCode {
        match self {
            ClipShareError::NoData => StatusCode::NoData,
            ClipShareError::DataError(_) => StatusCode::DataError,
            ClipShareError::MethodNotAllowed(_) => StatusCode::MethodNotAllowed,
            ClipShareError::ProtoMethodError(_) => StatusCode::ProtoMethodError,
            ClipShareError::ProtoVersionMismatch(_) => StatusCode::ProtoVersionMismatch,
            ClipShareError::ServerError(_) => StatusCode::ServerError,
            ClipShareError::CommunicationFailure(_) => StatusCode::CommunicationFailure,
            ClipShareError::ConnectionFailure(_) => StatusCode::ConnectionFailure,
            ClipShareError::InvalidAddress(_) => StatusCode::InvalidAddress,
            ClipShareError::LocalError(_) => StatusCode::LocalError,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClipShareError>;
