//! Names the user picks for jeos images, assemblies, deployables and resources.
//!
//! Every such name ends up as a path segment under the image or db
//! directories and as an argument to guest and cloud tools, so it is checked
//! before any of that happens.

use regex::Regex;
use std::sync::LazyLock;

use crate::domain::error::NameError;

/// Leading alphanumeric, then up to 63 of `[A-Za-z0-9._-]`. No separators,
/// no whitespace, no shell metacharacters.
pub static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{0,63}$").expect("valid regex")
});

/// Reject `name` unless it is safe to splice into a path or command line.
///
/// # Errors
///
/// Returns [`NameError::Invalid`] naming `kind` and the offending value.
pub fn validate_name(kind: &'static str, name: &str) -> Result<(), NameError> {
    if NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(NameError::Invalid {
            kind,
            name: name.to_string(),
        })
    }
}
