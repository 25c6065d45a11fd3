//! scm::avatar
//!
//! Gravatar URLs for committer emails.
//!
//! The hash is the lowercase hex MD5 of the lowercased email. Surrounding
//! whitespace is part of the input, as Gravatar itself does not trim.

use md5::{Digest, Md5};

use crate::core::config::DEFAULT_AVATAR_BASE_URL;

/// Lowercase hex MD5 of the lowercased email; `None` for an empty email.
///
/// # Example
///
/// ```
/// use scmkit::scm::avatar::avatar_hash;
///
/// assert_eq!(
///     avatar_hash("Test@Example.com").as_deref(),
///     Some("55502f40dc8b7c769880b10874abc9d0")
/// );
/// assert_eq!(avatar_hash(""), None);
/// ```
pub fn avatar_hash(email: &str) -> Option<String> {
    if email.is_empty() {
        return None;
    }
    let digest = Md5::digest(email.to_lowercase().as_bytes());
    Some(hex::encode(digest))
}

/// Avatar URL on the default Gravatar service.
pub fn avatar_url(email: &str) -> Option<String> {
    avatar_url_with_base(email, DEFAULT_AVATAR_BASE_URL)
}

/// Avatar URL under `base` (which should end with `/`).
pub fn avatar_url_with_base(email: &str, base: &str) -> Option<String> {
    avatar_hash(email).map(|hash| format!("{base}{hash}"))
}
