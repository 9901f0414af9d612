// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

//! Validation of the names that end up in certificates and file names.

use crate::error::{Error, Result};

/// Maximum DNS name length per RFC 1035
const MAX_DNS_NAME_LENGTH: usize = 253;
const MAX_LABEL_LENGTH: usize = 63;

/// Check that `domain` can be used as a common name and DNS SAN.
pub fn validate_domain(domain: &str) -> Result<()> {
    let invalid = |reason: &str| Error::InvalidDomain {
        domain: domain.to_string(),
        reason: reason.to_string(),
    };

    if domain.is_empty() {
        return Err(invalid("domain cannot be empty"));
    }
    if domain.len() > MAX_DNS_NAME_LENGTH {
        return Err(invalid("domain exceeds 253 characters"));
    }

    for label in domain.split('.') {
        if label.is_empty() {
            return Err(invalid("domain contains an empty label"));
        }
        if label.len() > MAX_LABEL_LENGTH {
            return Err(invalid("label exceeds 63 characters"));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(invalid("label cannot start or end with a hyphen"));
        }
        if let Some(c) = label
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && *c != '-' && *c != '_')
        {
            return Err(invalid(&format!("domain contains invalid character: '{}'", c)));
        }
    }

    Ok(())
}

/// Check that `user` is a single DNS label that is also safe in a file name.
pub fn validate_user(user: &str) -> Result<()> {
    let invalid = |reason: String| Error::InvalidUser {
        user: user.to_string(),
        reason,
    };

    if user.is_empty() {
        return Err(invalid("user cannot be empty".into()));
    }
    if user.len() > MAX_LABEL_LENGTH {
        return Err(invalid("user exceeds 63 characters".into()));
    }
    if user.starts_with('-') || user.ends_with('-') {
        return Err(invalid("user cannot start or end with a hyphen".into()));
    }
    if let Some(c) = user
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && *c != '-' && *c != '_')
    {
        return Err(invalid(format!("user contains invalid character: '{}'", c)));
    }

    Ok(())
}

/// The `<user>.<domain>` principal a client identity is issued for.
pub fn client_identity(domain: &str, user: &str) -> Result<String> {
    validate_user(user)?;
    validate_domain(domain)?;
    let identity = format!("{}.{}", user, domain);
    validate_domain(&identity)?;
    Ok(identity)
}
