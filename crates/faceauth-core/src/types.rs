use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Number of dimensions in a face descriptor.
pub const DESCRIPTOR_LEN: usize = 128;

/// Display name substituted when the enrolling caller supplies none.
pub const DEFAULT_DISPLAY_NAME: &str = "User";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("face descriptor is missing")]
    Missing,
    #[error("face descriptor must have 128 values, got {0}")]
    Length(usize),
    #[error("face descriptor value at index {0} is not a finite number")]
    NonFinite(usize),
}

/// Face embedding produced by an external recognition model.
///
/// Always exactly [`DESCRIPTOR_LEN`] finite values. The values carry no
/// meaning here beyond distance computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct FaceDescriptor(Vec<f32>);

impl FaceDescriptor {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

impl TryFrom<Vec<f32>> for FaceDescriptor {
    type Error = DescriptorError;

    fn try_from(values: Vec<f32>) -> Result<Self, Self::Error> {
        if values.len() != DESCRIPTOR_LEN {
            return Err(DescriptorError::Length(values.len()));
        }
        // NaN and infinities serialize to JSON `null` and poison every distance.
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(DescriptorError::NonFinite(index));
        }
        Ok(Self(values))
    }
}

impl TryFrom<&[f32]> for FaceDescriptor {
    type Error = DescriptorError;

    fn try_from(values: &[f32]) -> Result<Self, Self::Error> {
        Self::try_from(values.to_vec())
    }
}

impl From<FaceDescriptor> for Vec<f32> {
    fn from(descriptor: FaceDescriptor) -> Self {
        descriptor.0
    }
}

/// The single enrolled record this system authenticates against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: Uuid,
    pub display_name: String,
    pub descriptor: FaceDescriptor,
    pub enrolled_at: DateTime<Utc>,
}

impl Identity {
    /// Create a fresh identity stamped with a new id and the current UTC time.
    ///
    /// An empty or whitespace-only `display_name` becomes [`DEFAULT_DISPLAY_NAME`].
    pub fn new(display_name: &str, descriptor: FaceDescriptor) -> Self {
        let display_name = match display_name.trim() {
            "" => DEFAULT_DISPLAY_NAME.to_string(),
            _ => display_name.to_string(),
        };
        Self {
            id: Uuid::new_v4(),
            display_name,
            descriptor,
            enrolled_at: Utc::now(),
        }
    }
}

/// Outcome of comparing two descriptors. Derived, never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchVerdict {
    pub is_match: bool,
    /// Euclidean distance between the two descriptors.
    pub distance: f64,
    /// `(1 - distance) * 100`, rounded to two decimals and capped at 100.
    /// Not floored: very dissimilar descriptors yield negative values.
    pub confidence_percent: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_rejects_wrong_length() {
        assert_eq!(
            FaceDescriptor::try_from(vec![0.0; 127]),
            Err(DescriptorError::Length(127))
        );
        assert_eq!(FaceDescriptor::try_from(Vec::new()), Err(DescriptorError::Length(0)));
        assert_eq!(
            FaceDescriptor::try_from(vec![0.0; 129]),
            Err(DescriptorError::Length(129))
        );
    }

    #[test]
    fn test_descriptor_rejects_non_finite_values() {
        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let mut values = vec![0.1; DESCRIPTOR_LEN];
            values[7] = bad;
            assert_eq!(
                FaceDescriptor::try_from(values),
                Err(DescriptorError::NonFinite(7))
            );
        }
    }

    #[test]
    fn test_descriptor_deserialize_rejects_null_values() {
        let mut values: Vec<Option<f32>> = vec![Some(0.0); DESCRIPTOR_LEN];
        values[0] = None;
        let json = serde_json::to_string(&values).unwrap();
        assert!(serde_json::from_str::<FaceDescriptor>(&json).is_err());
    }

    #[test]
    fn test_descriptor_accepts_exact_length() {
        let d = FaceDescriptor::try_from(vec![0.5; DESCRIPTOR_LEN]).unwrap();
        assert_eq!(d.as_slice().len(), DESCRIPTOR_LEN);
    }

    #[test]
    fn test_descriptor_deserialize_enforces_length() {
        let short = serde_json::to_string(&vec![0.0f32; 3]).unwrap();
        assert!(serde_json::from_str::<FaceDescriptor>(&short).is_err());

        let ok = serde_json::to_string(&vec![0.0f32; DESCRIPTOR_LEN]).unwrap();
        assert!(serde_json::from_str::<FaceDescriptor>(&ok).is_ok());
    }

    #[test]
    fn test_identity_empty_name_gets_placeholder() {
        let d = FaceDescriptor::try_from(vec![0.0; DESCRIPTOR_LEN]).unwrap();
        assert_eq!(Identity::new("", d.clone()).display_name, DEFAULT_DISPLAY_NAME);
        assert_eq!(Identity::new("   ", d.clone()).display_name, DEFAULT_DISPLAY_NAME);
        assert_eq!(Identity::new("Alice", d).display_name, "Alice");
    }

    #[test]
    fn test_identity_ids_are_unique() {
        let d = FaceDescriptor::try_from(vec![0.0; DESCRIPTOR_LEN]).unwrap();
        let a = Identity::new("a", d.clone());
        let b = Identity::new("a", d);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_identity_json_field_names() {
        let d = FaceDescriptor::try_from(vec![0.0; DESCRIPTOR_LEN]).unwrap();
        let json = serde_json::to_value(Identity::new("Alice", d)).unwrap();
        assert!(json.get("id").is_some());
        assert_eq!(json["displayName"], "Alice");
        assert_eq!(json["descriptor"].as_array().unwrap().len(), DESCRIPTOR_LEN);
        assert!(json.get("enrolledAt").is_some());
    }
}
