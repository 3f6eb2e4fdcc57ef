//! Naming policy shared by every path a tier or group name enters through.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::ModelError;

pub const MAX_GROUP_LEN: usize = 253;

// Lowercase only; ':' keeps namespaced groups such as `system:authenticated` legal.
static GROUP_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]([a-z0-9:._-]*[a-z0-9])?$").expect("static group regex"));

/// Check a group identifier against the normalized-name policy.
pub fn validate_group(group: &str) -> Result<(), ModelError> {
    if group.is_empty() {
        return Err(ModelError::InvalidGroup("group name must not be empty".into()));
    }
    if group.len() > MAX_GROUP_LEN {
        return Err(ModelError::InvalidGroup(format!(
            "'{group}' exceeds {MAX_GROUP_LEN} characters"
        )));
    }
    if !GROUP_NAME.is_match(group) {
        return Err(ModelError::InvalidGroup(format!(
            "'{group}' must consist of lowercase alphanumerics, ':', '.', '_' or '-', \
             and start and end with an alphanumeric"
        )));
    }
    Ok(())
}

/// Check a tier name. Names are matched exactly and case-sensitively, so the
/// only rules are: non-empty, no whitespace, no control characters.
pub fn validate_tier_name(name: &str) -> Result<(), ModelError> {
    if name.is_empty() {
        return Err(ModelError::InvalidName("tier name must not be empty".into()));
    }
    if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ModelError::InvalidName(format!(
            "{name:?} must not contain whitespace or control characters"
        )));
    }
    Ok(())
}

/// Validate every group and collapse duplicates, keeping the first occurrence.
pub fn normalize_groups<I>(groups: I) -> Result<Vec<String>, ModelError>
where
    I: IntoIterator<Item = String>,
{
    let mut out: Vec<String> = Vec::new();
    for group in groups {
        validate_group(&group)?;
        if !out.contains(&group) {
            out.push(group);
        }
    }
    Ok(out)
}
