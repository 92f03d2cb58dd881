//! Credential wrapper that never prints its contents.

use std::fmt;

use zeroize::Zeroizing;

/// A configuration value that must not appear in logs.
///
/// The backing buffer is wiped when the last copy is dropped.
///
/// ```
/// use microservice::config::Secret;
///
/// let secret = Secret::new("hunter2".to_owned());
/// assert_eq!(secret.expose(), "hunter2");
/// assert!(!format!("{secret:?}").contains("hunter2"));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(Zeroizing<String>);

impl Secret {
    /// Wrap a raw credential.
    #[must_use]
    pub fn new(value: String) -> Self {
        Self(Zeroizing::new(value))
    }

    /// Borrow the raw credential for handing to a client library.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret([redacted])")
    }
}
