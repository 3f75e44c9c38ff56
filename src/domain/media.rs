//! Incoming media descriptors and the pre-download limit checks.

use thiserror::Error;

/// Identifier of a remotely stored source video, as declared by the chat
/// platform. Immutable; lives for exactly one job.
#[derive(Debug, Clone)]
pub struct MediaRef {
    pub file_id: String,
    pub duration_secs: Option<u64>,
    pub size_bytes: Option<u64>,
    pub content_type: Option<String>,
}

/// Ceilings for declared media metadata.
#[derive(Debug, Clone, Copy)]
pub struct MediaLimits {
    pub max_duration_secs: u64,
    pub max_size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("duration {actual} s exceeds the {max} s limit")]
    TooLong { actual: u64, max: u64 },
    #[error("size {actual} bytes exceeds the {max} bytes limit")]
    TooLarge { actual: u64, max: u64 },
}

/// Check declared metadata against the configured ceilings before any I/O is
/// spent. Duration first, then size; a missing value skips its check, since
/// the metadata is trusted when present but never required.
pub fn validate(media: &MediaRef, limits: &MediaLimits) -> Result<(), ValidationError> {
    if let Some(actual) = media.duration_secs {
        if actual > limits.max_duration_secs {
            return Err(ValidationError::TooLong {
                actual,
                max: limits.max_duration_secs,
            });
        }
    }
    if let Some(actual) = media.size_bytes {
        if actual > limits.max_size_bytes {
            return Err(ValidationError::TooLarge {
                actual,
                max: limits.max_size_bytes,
            });
        }
    }
    Ok(())
}
