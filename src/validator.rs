//! Local screening of file candidates.
//!
//! Rules run in a fixed order and the first failure wins: extension, then the
//! minimum size, then the maximum size. Nothing here touches the network.

use crate::config::ValidationConfig;
use crate::types::{FileCandidate, RejectReason};

/// Classify a candidate as acceptable or rejected with a specific reason
pub fn validate(
    candidate: &FileCandidate,
    rules: &ValidationConfig,
) -> std::result::Result<(), RejectReason> {
    validate_parts(candidate.name(), candidate.size(), rules)
}

/// Same as [`validate`], for callers that only have a name and a size
pub fn validate_parts(
    name: &str,
    size: u64,
    rules: &ValidationConfig,
) -> std::result::Result<(), RejectReason> {
    if !name.ends_with(&rules.required_extension) {
        return Err(RejectReason::WrongExtension {
            expected: rules.required_extension.clone(),
        });
    }
    if size < rules.min_size_bytes {
        return Err(RejectReason::TooSmall { size });
    }
    if size > rules.max_size_bytes {
        return Err(RejectReason::TooLarge { size });
    }
    Ok(())
}
