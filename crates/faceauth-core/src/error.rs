use crate::matcher::MatchError;
use crate::store::StoreError;
use crate::types::DescriptorError;
use thiserror::Error;

/// Message returned to callers when login is attempted with nothing enrolled.
pub const NO_IDENTITY_MESSAGE: &str = "No registered users. Please register first.";

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Invalid face descriptor: {0}")]
    InvalidDescriptor(#[from] DescriptorError),
    #[error("{}", NO_IDENTITY_MESSAGE)]
    NoIdentityEnrolled,
    #[error("matcher failed: {0}")]
    DimensionMismatch(#[from] MatchError),
    #[error("failed to persist identity: {0}")]
    Persistence(#[from] StoreError),
}

impl ServiceError {
    /// True for failures caused by the caller's input or state, false for
    /// internal faults the caller cannot fix.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidDescriptor(_) | Self::NoIdentityEnrolled)
    }
}
