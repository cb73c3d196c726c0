//! faceauth-core: face descriptor matching and single-identity enrollment.
//!
//! Descriptors come from an external recognition model. This crate decides
//! whether two of them belong to the same face and persists the one enrolled
//! identity.

pub mod api;
pub mod error;
pub mod matcher;
pub mod service;
pub mod store;
pub mod types;

pub use error::ServiceError;
pub use matcher::{EuclideanMatcher, MatchError, Matcher, DEFAULT_THRESHOLD};
pub use service::{Authentication, EnrollmentStatus, FaceAuthService};
pub use store::{open_store, DescriptorStore, StoreBackend, StoreError};
pub use types::{DescriptorError, FaceDescriptor, Identity, MatchVerdict, DESCRIPTOR_LEN};
