//! Caller identity threaded explicitly into every operation

use std::fmt;

use crate::error::{Error, Result};

/// Authenticated user id supplied by the calling layer
///
/// The progression core never reads session state; whoever authenticated the
/// request hands the id in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallerId(String);

impl CallerId {
    /// Wrap a raw user id; blank ids are rejected as `Unauthorized`
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::Unauthorized);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
