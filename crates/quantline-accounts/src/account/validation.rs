//! Field validation rules for account profiles.
//!
//! Instance-format rules differ per channel, so each channel maps to one
//! validation function here rather than branching at every call site.

use super::model::Channel;
use crate::error::{Error, Result};

/// Validate a token credential: any non-empty string passes.
///
/// # Errors
///
/// Returns the token-field error if the token is empty.
pub fn validate_token(token: &str) -> Result<()> {
    if token.is_empty() {
        return Err(Error::invalid_field("token"));
    }
    Ok(())
}

/// Validate an instance identifier against the rules of `channel`.
///
/// # Errors
///
/// Returns the instance-field error on violation.
pub fn validate_instance(channel: Channel, instance: Option<&str>) -> Result<()> {
    instance_rule(channel)(instance)
}

/// Per-channel instance rule lookup.
fn instance_rule(channel: Channel) -> fn(Option<&str>) -> Result<()> {
    match channel {
        Channel::IbmQuantum => hub_group_project,
        Channel::IbmCloud => opaque_identifier,
    }
}

/// Hierarchical rule: instance is optional, but when present must be
/// `hub/group/project` with three non-empty segments.
fn hub_group_project(instance: Option<&str>) -> Result<()> {
    match instance {
        None => Ok(()),
        Some(value) => {
            let segments: Vec<&str> = value.split('/').collect();
            if segments.len() == 3 && segments.iter().all(|s| !s.is_empty()) {
                Ok(())
            } else {
                Err(Error::invalid_field("instance"))
            }
        }
    }
}

/// Opaque rule: instance is mandatory and any non-empty string is accepted.
fn opaque_identifier(instance: Option<&str>) -> Result<()> {
    match instance {
        Some(value) if !value.is_empty() => Ok(()),
        _ => Err(Error::invalid_field("instance")),
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_token() {
        assert!(validate_token("token-x").is_ok());
        assert!(validate_token("123").is_ok());
    }

    #[test]
    fn test_empty_token() {
        let err = validate_token("").unwrap_err();
        assert!(err.to_string().contains("Invalid `token` value."));
    }

    #[test]
    fn test_quantum_instance_optional() {
        assert!(validate_instance(Channel::IbmQuantum, None).is_ok());
    }

    #[test]
    fn test_quantum_instance_well_formed() {
        assert!(validate_instance(Channel::IbmQuantum, Some("hub/group/project")).is_ok());
        assert!(validate_instance(Channel::IbmQuantum, Some("h/g/p")).is_ok());
    }

    #[test]
    fn test_quantum_instance_malformed() {
        for instance in ["", "no-hgp-format", "h/g", "h/g/p/x", "h//p", "/g/p", "h/g/"] {
            let err = validate_instance(Channel::IbmQuantum, Some(instance)).unwrap_err();
            assert!(
                err.to_string().contains("Invalid `instance` value."),
                "expected instance error for {instance:?}"
            );
        }
    }

    #[test]
    fn test_cloud_instance_required() {
        assert!(validate_instance(Channel::IbmCloud, None).is_err());
        assert!(validate_instance(Channel::IbmCloud, Some("")).is_err());
    }

    #[test]
    fn test_cloud_instance_opaque() {
        assert!(validate_instance(Channel::IbmCloud, Some("crn:v1:bluemix:public")).is_ok());
        assert!(validate_instance(Channel::IbmCloud, Some("anything")).is_ok());
    }
}
