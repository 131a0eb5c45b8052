//! Folder and file name validation.
//!
//! Names handed to a store must be a single path segment: stores that map
//! names onto a real filesystem would otherwise be open to traversal.

use crate::error::{ErrorKind, Result};

/// Validates that a name is usable as a single segment.
///
/// > **Note:** Leading/trailing whitespace is **not** trimmed; names are
/// >           compared exactly.
///
/// # Examples
///
/// ```
/// use pcat_store::validate_name;
/// assert!(validate_name("2023").is_ok());
/// assert!(validate_name("IMG_0001.jpg").is_ok());
/// assert!(validate_name("..").is_err());
/// assert!(validate_name("a/b").is_err());
/// assert!(validate_name("").is_err());
/// ```
pub fn validate(name: &str) -> Result<&str> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        // Null bytes cause truncation in C-based syscalls.
        || name.contains(['/', '\\', '\0']);
    if invalid {
        exn::bail!(ErrorKind::InvalidName(name.to_string()));
    }
    Ok(name)
}
