// src/version/mod.rs

//! Server API versions
//!
//! TeamForge reports its API version as four dot-separated integers, for
//! example `5.3.0.0`. Versions compare component by component, most
//! significant first.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// A four-part server API version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ApiVersion([u32; 4]);

impl ApiVersion {
    pub const fn new(major: u32, minor: u32, patch: u32, build: u32) -> Self {
        Self([major, minor, patch, build])
    }

    pub fn parts(&self) -> [u32; 4] {
        self.0
    }

    /// Check whether this version falls in `[start, end)`
    ///
    /// A missing bound is not checked.
    pub fn is_within(&self, start: Option<ApiVersion>, end: Option<ApiVersion>) -> bool {
        if let Some(start) = start
            && *self < start
        {
            return false;
        }
        match end {
            Some(end) => *self < end,
            None => true,
        }
    }
}

impl FromStr for ApiVersion {
    type Err = Error;

    /// Parse a version string
    ///
    /// Examples:
    /// - "5.3.0.0" → [5, 3, 0, 0]
    /// - "6.1" → error (four parts required)
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.len() != 4 {
            return Err(Error::ParseError(format!(
                "API version '{}' must have four parts",
                s
            )));
        }

        let mut nums = [0u32; 4];
        for (slot, part) in nums.iter_mut().zip(&parts) {
            *slot = part.parse::<u32>().map_err(|e| {
                Error::ParseError(format!("Invalid component '{}' in API version '{}': {}", part, s, e))
            })?;
        }

        Ok(Self(nums))
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{}.{}.{}.{}", a, b, c, d)
    }
}
