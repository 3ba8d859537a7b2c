//! Environment variable expansion for configuration files
//!
//! Configuration text may reference secrets such as access tokens with the
//! `${VAR_NAME}` syntax. Expansion happens on the raw YAML before parsing.

use std::collections::BTreeSet;
use std::env;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::config::ConfigError;

/// Matches `${VAR_NAME}` references
static VAR_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"));

/// Expand every `${VAR_NAME}` reference in `input`.
///
/// Fails with a single error naming all unset variables (sorted, deduplicated).
pub fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut missing = BTreeSet::new();

    let expanded = VAR_REFERENCE.replace_all(input, |caps: &Captures<'_>| {
        let name = &caps[1];
        match env::var(name) {
            Ok(value) => value,
            Err(_) => {
                missing.insert(name.to_string());
                String::new()
            }
        }
    });

    if !missing.is_empty() {
        let names: Vec<String> = missing.into_iter().collect();
        return Err(ConfigError::ValidationError(format!(
            "Missing environment variables: {}",
            names.join(", ")
        )));
    }

    Ok(expanded.into_owned())
}
