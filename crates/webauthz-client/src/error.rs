//! Webauthz client error types

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WebauthzError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response from {uri}: {status}")]
    UnexpectedStatus { uri: String, status: StatusCode },

    #[error("Invalid URI: {0}")]
    InvalidUri(String),

    #[error("Access request not found: {0}")]
    AccessRequestNotFound(String),

    #[error("Access request {client_state} does not belong to user {user_id}")]
    AccessRequestUserMismatch { client_state: String, user_id: String },

    #[error("Client id mismatch for access request {0}")]
    ClientMismatch(String),

    #[error("Grant token required")]
    MissingGrantToken,
}

pub type Result<T> = std::result::Result<T, WebauthzError>;
