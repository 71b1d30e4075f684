// src/interpolate.rs
//! `${VAR}` expansion for file patterns and text parameters
//!
//! A reference to a variable that is not defined is reported as an error
//! instead of being left in place, so a typo in a job parameter never reaches
//! the server as a literal `${...}` string.

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;
use thiserror::Error;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{(\w*)\}").unwrap());

/// Interpolation failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InterpolateError {
    #[error("Unknown variable '{name}' in '{input}'")]
    UnknownVariable { name: String, input: String },
}

impl From<InterpolateError> for crate::error::Error {
    fn from(err: InterpolateError) -> Self {
        crate::error::Error::ParseError(err.to_string())
    }
}

/// Expand every `${NAME}` in `input` from `vars`
pub fn interpolate(input: &str, vars: &HashMap<String, String>) -> Result<String, InterpolateError> {
    let mut missing = None;
    let expanded = PLACEHOLDER.replace_all(input, |caps: &Captures<'_>| {
        let name = &caps[1];
        match vars.get(name) {
            Some(value) => value.clone(),
            None => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(name) => Err(InterpolateError::UnknownVariable {
            name,
            input: input.to_string(),
        }),
        None => Ok(expanded.into_owned()),
    }
}

/// Expand against the process environment
pub fn interpolate_env(input: &str) -> Result<String, InterpolateError> {
    let vars: HashMap<String, String> = std::env::vars().collect();
    interpolate(input, &vars)
}
