//! Enrollment, authentication and status operations over a [`DescriptorStore`].
//!
//! Descriptor validation happens before any store access. Store reads fail
//! open to "nothing enrolled"; store writes propagate as
//! [`ServiceError::Persistence`].
//!
//! Two concurrent enrollments race: whichever commits last is the enrolled
//! identity. Callers needing a strict order must serialize `enroll` themselves.

use crate::api::{
    LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, StatusResponse,
    LOGIN_DENIED_MESSAGE, LOGIN_SUCCESS_MESSAGE, REGISTER_SUCCESS_MESSAGE,
};
use crate::error::{ServiceError, NO_IDENTITY_MESSAGE};
use crate::matcher::{EuclideanMatcher, Matcher, DEFAULT_THRESHOLD};
use crate::store::DescriptorStore;
use crate::types::{DescriptorError, FaceDescriptor, Identity, MatchVerdict};

/// Outcome of an authentication attempt against the enrolled identity.
#[derive(Debug, Clone, PartialEq)]
pub enum Authentication {
    Accepted {
        display_name: String,
        verdict: MatchVerdict,
    },
    /// The display name is withheld so a failed attempt learns nothing about
    /// who is enrolled.
    Denied { verdict: MatchVerdict },
}

/// Whether an identity is enrolled, and under which name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentStatus {
    pub enrolled: bool,
    pub display_name: Option<String>,
}

pub struct FaceAuthService<S, M = EuclideanMatcher> {
    store: S,
    matcher: M,
    threshold: f64,
}

impl<S: DescriptorStore> FaceAuthService<S> {
    /// Service with the Euclidean matcher and the default 0.4 threshold.
    pub fn new(store: S) -> Self {
        Self::with_matcher(store, EuclideanMatcher)
    }
}

impl<S: DescriptorStore, M: Matcher> FaceAuthService<S, M> {
    pub fn with_matcher(store: S, matcher: M) -> Self {
        Self {
            store,
            matcher,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    /// Override the match threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Validate `descriptor` and commit a new identity, replacing any prior one.
    pub fn enroll(&self, display_name: &str, descriptor: &[f32]) -> Result<Identity, ServiceError> {
        let descriptor = FaceDescriptor::try_from(descriptor)?;
        let identity = Identity::new(display_name, descriptor);

        self.store.save(&identity)?;

        tracing::info!(
            id = %identity.id,
            display_name = %identity.display_name,
            "identity enrolled"
        );
        Ok(identity)
    }

    /// Compare `descriptor` against the enrolled identity.
    pub fn authenticate(&self, descriptor: &[f32]) -> Result<Authentication, ServiceError> {
        let candidate = FaceDescriptor::try_from(descriptor)?;

        let Some(enrolled) = self.store.load() else {
            tracing::info!("authentication attempted with no identity enrolled");
            return Err(ServiceError::NoIdentityEnrolled);
        };

        let verdict = self.matcher.compare(
            candidate.as_slice(),
            enrolled.descriptor.as_slice(),
            self.threshold,
        )?;

        tracing::info!(
            matched = verdict.is_match,
            distance = verdict.distance,
            confidence = verdict.confidence_percent,
            threshold = self.threshold,
            "authentication compared"
        );

        Ok(if verdict.is_match {
            Authentication::Accepted {
                display_name: enrolled.display_name,
                verdict,
            }
        } else {
            Authentication::Denied { verdict }
        })
    }

    pub fn enrollment_status(&self) -> EnrollmentStatus {
        match self.store.load() {
            Some(identity) => EnrollmentStatus {
                enrolled: true,
                display_name: Some(identity.display_name),
            },
            None => EnrollmentStatus {
                enrolled: false,
                display_name: None,
            },
        }
    }

    /// Transport-facing registration.
    pub fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse, ServiceError> {
        let descriptor = request
            .descriptor
            .as_deref()
            .ok_or(DescriptorError::Missing)?;
        let identity = self.enroll(&request.display_name, descriptor)?;

        Ok(RegisterResponse {
            success: true,
            message: REGISTER_SUCCESS_MESSAGE.to_string(),
            display_name: identity.display_name,
        })
    }

    /// Transport-facing login.
    ///
    /// A login with nothing enrolled is a denial response, not an error.
    pub fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ServiceError> {
        let descriptor = request
            .descriptor
            .as_deref()
            .ok_or(DescriptorError::Missing)?;

        match self.authenticate(descriptor) {
            Ok(Authentication::Accepted {
                display_name,
                verdict,
            }) => Ok(LoginResponse {
                success: true,
                message: LOGIN_SUCCESS_MESSAGE.to_string(),
                confidence_percent: Some(verdict.confidence_percent),
                display_name: Some(display_name),
            }),
            Ok(Authentication::Denied { verdict }) => Ok(LoginResponse {
                success: false,
                message: LOGIN_DENIED_MESSAGE.to_string(),
                confidence_percent: Some(verdict.confidence_percent),
                display_name: None,
            }),
            Err(ServiceError::NoIdentityEnrolled) => Ok(LoginResponse {
                success: false,
                message: NO_IDENTITY_MESSAGE.to_string(),
                confidence_percent: None,
                display_name: None,
            }),
            Err(e) => Err(e),
        }
    }

    /// Transport-facing status.
    pub fn status(&self) -> StatusResponse {
        let status = self.enrollment_status();
        StatusResponse {
            enrolled: status.enrolled,
            user_count: u8::from(status.enrolled),
            display_name: status.display_name,
        }
    }
}
