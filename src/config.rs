// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

use crate::error::{Error, Result};
use directories::ProjectDirs;
use rcgen::{DistinguishedName, DnType};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Current config file version. Increment when making breaking changes.
const CONFIG_VERSION: u32 = 1;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "AE_PKI_CONFIG";

/// Smallest RSA modulus accepted for signing keys.
pub const MIN_KEY_BITS: usize = 2048;
/// Largest RSA modulus accepted for signing keys.
pub const MAX_KEY_BITS: usize = 8192;
/// Upper bound on any validity window, matching the root CA default.
pub const MAX_DAYS: u32 = 9999;

/// Issuance policy: key sizes, validity windows, subject fields and the
/// key identifier derivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Config file version for future migration support
    #[serde(default = "default_config_version")]
    pub config_version: u32,
    #[serde(default = "default_ca_key_bits")]
    pub ca_key_bits: usize,
    #[serde(default = "default_client_key_bits")]
    pub client_key_bits: usize,
    #[serde(default = "default_ca_days")]
    pub ca_days: u32,
    #[serde(default = "default_client_days")]
    pub client_days: u32,
    #[serde(default)]
    pub key_id: KeyIdStrategy,
    #[serde(default)]
    pub subject: SubjectPolicy,
}

fn default_config_version() -> u32 {
    CONFIG_VERSION
}

// Root keys are generated once; leaf keys get the larger margin.
fn default_ca_key_bits() -> usize {
    2048
}

fn default_client_key_bits() -> usize {
    4096
}

fn default_ca_days() -> u32 {
    9999
}

fn default_client_days() -> u32 {
    365
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_version: CONFIG_VERSION,
            ca_key_bits: default_ca_key_bits(),
            client_key_bits: default_client_key_bits(),
            ca_days: default_ca_days(),
            client_days: default_client_days(),
            key_id: KeyIdStrategy::default(),
            subject: SubjectPolicy::default(),
        }
    }
}

/// How the SubjectKeyIdentifier of issued certificates is derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyIdStrategy {
    /// SHA-1 over the big-endian bytes of the RSA modulus. Roots created by
    /// earlier releases of the tool carry this identifier.
    #[default]
    ModulusSha1,
    /// SHA-1 over the subjectPublicKey bit string (RFC 5280, 4.2.1.2 method 1).
    PublicKeySha1,
}

/// Organizational subject fields stamped on every certificate and request.
/// Only the common name and DNS names vary per artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectPolicy {
    #[serde(default = "default_organization")]
    pub organization: String,
    #[serde(default = "default_organizational_unit")]
    pub organizational_unit: String,
    #[serde(default = "default_locality")]
    pub locality: String,
    #[serde(default = "default_province")]
    pub province: String,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_organization() -> String {
    "Aurae".into()
}

fn default_organizational_unit() -> String {
    "Runtime".into()
}

fn default_locality() -> String {
    "aurae".into()
}

fn default_province() -> String {
    "aurae".into()
}

fn default_country() -> String {
    "IS".into()
}

impl Default for SubjectPolicy {
    fn default() -> Self {
        Self {
            organization: default_organization(),
            organizational_unit: default_organizational_unit(),
            locality: default_locality(),
            province: default_province(),
            country: default_country(),
        }
    }
}

impl SubjectPolicy {
    /// Build the distinguished name for `common_name` under this policy.
    pub fn distinguished_name(&self, common_name: &str) -> DistinguishedName {
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CountryName, self.country.as_str());
        dn.push(DnType::StateOrProvinceName, self.province.as_str());
        dn.push(DnType::LocalityName, self.locality.as_str());
        dn.push(DnType::OrganizationName, self.organization.as_str());
        dn.push(DnType::OrganizationalUnitName, self.organizational_unit.as_str());
        dn.push(DnType::CommonName, common_name);
        dn
    }

    fn validate(&self) -> Result<()> {
        if self.country.len() != 2 || !self.country.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(Error::Config(format!(
                "subject.country must be a two-letter uppercase code, got '{}'",
                self.country
            )));
        }
        for (field, value) in [
            ("organization", &self.organization),
            ("organizational_unit", &self.organizational_unit),
            ("locality", &self.locality),
            ("province", &self.province),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("subject.{} cannot be empty", field)));
            }
        }
        Ok(())
    }
}

impl Config {
    /// Default config location: `$AE_PKI_CONFIG`, else `<config dir>/ae/pki.toml`.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(custom) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(&custom);
            if !path.is_absolute() {
                return Err(Error::Config(format!(
                    "{} must be an absolute path, got: {}",
                    CONFIG_ENV, custom
                )));
            }
            return Ok(path);
        }

        ProjectDirs::from("", "", "ae")
            .map(|dirs| dirs.config_dir().join("pki.toml"))
            .ok_or_else(|| {
                Error::Config(format!(
                    "Could not determine config directory. Set {} to a config file path.",
                    CONFIG_ENV
                ))
            })
    }

    /// Load the config at `path`, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        let config: Self = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|e| Error::ReadFile {
                path: path.to_path_buf(),
                source: e,
            })?;
            toml::from_str(&content).map_err(|e| Error::Config(e.to_string()))?
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.config_version > CONFIG_VERSION {
            tracing::warn!(
                found = self.config_version,
                supported = CONFIG_VERSION,
                "config file version is newer than supported; unknown settings are ignored"
            );
        }

        validate_key_bits("ca_key_bits", self.ca_key_bits)?;
        validate_key_bits("client_key_bits", self.client_key_bits)?;
        validate_days("ca_days", self.ca_days)?;
        validate_days("client_days", self.client_days)?;
        self.subject.validate()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            crate::fs::ensure_dir(parent)?;
        }
        crate::fs::atomic_write(path, content.as_bytes())
    }
}

fn validate_key_bits(field: &str, bits: usize) -> Result<()> {
    if !(MIN_KEY_BITS..=MAX_KEY_BITS).contains(&bits) || bits % 8 != 0 {
        return Err(Error::Config(format!(
            "{} must be a multiple of 8 between {} and {}, got {}",
            field, MIN_KEY_BITS, MAX_KEY_BITS, bits
        )));
    }
    Ok(())
}

/// Validate that a validity period is within allowed bounds.
///
/// # Errors
/// Returns an error if `days` is 0 or exceeds [`MAX_DAYS`].
pub fn validate_days(field: &str, days: u32) -> Result<()> {
    if days == 0 {
        return Err(Error::InvalidDays(format!("{} cannot be 0", field)));
    }
    if days > MAX_DAYS {
        return Err(Error::InvalidDays(format!(
            "{} cannot exceed {}",
            field, MAX_DAYS
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.ca_key_bits, 2048);
        assert_eq!(config.client_key_bits, 4096);
        assert_eq!(config.ca_days, 9999);
        assert_eq!(config.client_days, 365);
        assert_eq!(config.key_id, KeyIdStrategy::ModulusSha1);
        assert_eq!(config.subject.organization, "Aurae");
        assert_eq!(config.subject.organizational_unit, "Runtime");
        assert_eq!(config.subject.locality, "aurae");
        assert_eq!(config.subject.province, "aurae");
        assert_eq!(config.subject.country, "IS");
    }

    #[test]
    fn test_config_load_missing_file() {
        let path = PathBuf::from("/nonexistent/pki.toml");
        let config =
            Config::load(&path).expect("Config should load with defaults for missing file");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_load_partial() {
        let mut file = NamedTempFile::new().expect("temp file should be created");
        writeln!(file, "client_days = 30").expect("write client_days should succeed");
        writeln!(file, "key_id = \"public-key-sha1\"").expect("write key_id should succeed");
        writeln!(file, "[subject]").expect("write subject section should succeed");
        writeln!(file, "organization = \"Example\"").expect("write organization should succeed");

        let config = Config::load(file.path()).expect("Config should load with partial values");
        assert_eq!(config.client_days, 30);
        assert_eq!(config.key_id, KeyIdStrategy::PublicKeySha1);
        assert_eq!(config.subject.organization, "Example");
        // untouched fields keep their defaults
        assert_eq!(config.ca_days, 9999);
        assert_eq!(config.subject.country, "IS");
    }

    #[test]
    fn test_config_save_and_load() {
        let file = NamedTempFile::new().expect("temp file should be created");
        let config = Config {
            client_key_bits: 3072,
            client_days: 90,
            ..Config::default()
        };

        config.save(file.path()).expect("Config should save successfully");
        let loaded = Config::load(file.path()).expect("Config should load after save");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_rejects_small_keys() {
        let mut file = NamedTempFile::new().expect("temp file should be created");
        writeln!(file, "client_key_bits = 1024").expect("write should succeed");

        let err = Config::load(file.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_config_rejects_zero_days() {
        let mut file = NamedTempFile::new().expect("temp file should be created");
        writeln!(file, "client_days = 0").expect("write should succeed");
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_config_rejects_bad_country() {
        let mut file = NamedTempFile::new().expect("temp file should be created");
        writeln!(file, "[subject]").expect("write should succeed");
        writeln!(file, "country = \"Iceland\"").expect("write should succeed");
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_config_rejects_malformed_toml() {
        let mut file = NamedTempFile::new().expect("temp file should be created");
        writeln!(file, "ca_days = [").expect("write should succeed");
        let err = Config::load(file.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_validate_days() {
        assert!(validate_days("ca_days", 0).is_err());
        assert!(validate_days("ca_days", MAX_DAYS + 1).is_err());
        assert!(validate_days("ca_days", MAX_DAYS).is_ok());
        assert!(validate_days("client_days", 1).is_ok());
    }

    #[test]
    fn test_distinguished_name_carries_policy() {
        let dn = SubjectPolicy::default().distinguished_name("my.domain.com");
        assert!(dn.get(&DnType::CommonName).is_some());
        assert!(dn.get(&DnType::OrganizationName).is_some());
        assert!(dn.get(&DnType::StateOrProvinceName).is_some());
        assert_eq!(dn.iter().count(), 6);
    }
}
