//! Printful-related errors.

use thiserror::Error;

/// Errors that can occur when talking to Printful.
#[derive(Debug, Error)]
pub enum PrintfulError {
    /// HTTP request failed.
    #[error("Printful request failed: {0}")]
    Request(String),

    /// Failed to parse response.
    #[error("Printful response error: {0}")]
    Response(String),

    /// Printful API returned an error.
    #[error("Printful API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Order can't be built for Printful.
    #[error("Invalid Printful order: {0}")]
    InvalidOrder(String),
}
