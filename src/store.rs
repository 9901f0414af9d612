// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

//! Writing issued artifacts to a directory.
//!
//! Both files of an artifact are staged as temporary files in the target
//! directory and only then renamed into place, so a failure while writing
//! never leaves a half-written PEM file behind.

use crate::cert::Certificate;
use crate::csr::CertificateRequest;
use crate::error::{Error, Result};
use crate::fs;
use crate::identity::validate_user;
use std::path::{Path, PathBuf};

pub const CA_CERT_FILE: &str = "ca.crt";
pub const CA_KEY_FILE: &str = "ca.key";

/// One PEM file to be written.
#[derive(Clone, Copy)]
struct Entry<'a> {
    name: &'a str,
    contents: &'a str,
}

/// The files that make up one issued artifact.
#[derive(Clone)]
pub struct ArtifactFiles<'a> {
    names: (String, String),
    primary: &'a str,
    private_key: &'a str,
}

impl std::fmt::Debug for ArtifactFiles<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactFiles")
            .field("names", &self.names)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

impl<'a> ArtifactFiles<'a> {
    /// `ca.crt` and `ca.key`.
    pub fn root_ca(ca: &'a Certificate) -> Self {
        Self {
            names: (CA_CERT_FILE.to_string(), CA_KEY_FILE.to_string()),
            primary: &ca.certificate,
            private_key: &ca.private_key,
        }
    }

    /// `client.<user>.crt` and `client.<user>.key`.
    pub fn client_certificate(cert: &'a Certificate, user: &str) -> Result<Self> {
        validate_user(user)?;
        Ok(Self {
            names: (format!("client.{}.crt", user), format!("client.{}.key", user)),
            primary: &cert.certificate,
            private_key: &cert.private_key,
        })
    }

    /// `client.<user>.csr` and `client.<user>.key`, using the request's own user.
    pub fn request(csr: &'a CertificateRequest) -> Result<Self> {
        validate_user(&csr.user)?;
        Ok(Self {
            names: (
                format!("client.{}.csr", csr.user),
                format!("client.{}.key", csr.user),
            ),
            primary: &csr.csr,
            private_key: &csr.private_key,
        })
    }

    /// A certificate and key under caller-chosen file names.
    pub fn named(cert: &'a Certificate, cert_name: &str, key_name: &str) -> Result<Self> {
        validate_file_name(cert_name)?;
        validate_file_name(key_name)?;
        if cert_name == key_name {
            return Err(Error::InvalidPath(PathBuf::from(cert_name)));
        }
        Ok(Self {
            names: (cert_name.to_string(), key_name.to_string()),
            primary: &cert.certificate,
            private_key: &cert.private_key,
        })
    }

    /// File name of the certificate or request.
    pub fn primary_name(&self) -> &str {
        &self.names.0
    }

    /// File name of the private key.
    pub fn key_name(&self) -> &str {
        &self.names.1
    }

    fn primary(&self) -> Entry<'_> {
        Entry {
            name: &self.names.0,
            contents: self.primary,
        }
    }

    fn key(&self) -> Entry<'_> {
        Entry {
            name: &self.names.1,
            contents: self.private_key,
        }
    }
}

fn validate_file_name(name: &str) -> Result<()> {
    let path = Path::new(name);
    let is_plain = path.file_name().and_then(|n| n.to_str()) == Some(name);
    if name.is_empty() || !is_plain || name.starts_with(".tmp-") {
        return Err(Error::InvalidPath(path.to_path_buf()));
    }
    Ok(())
}

/// Where an artifact ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persisted {
    pub primary: PathBuf,
    pub private_key: PathBuf,
}

/// Write `files` into `directory`, creating it if needed.
///
/// Existing files are replaced. The key is committed before the certificate
/// so that a certificate is never visible without its key; if the second
/// rename fails the error names both paths.
pub fn persist(directory: &Path, files: &ArtifactFiles<'_>) -> Result<Persisted> {
    fs::ensure_dir(directory)?;

    let primary = files.primary();
    let key = files.key();
    let primary_dest = directory.join(primary.name);
    let key_dest = directory.join(key.name);

    let staged_primary = fs::stage(&primary_dest, primary.contents.as_bytes(), false)?;
    let staged_key = match fs::stage(&key_dest, key.contents.as_bytes(), true) {
        Ok(staged) => staged,
        Err(e) => {
            fs::discard(&staged_primary);
            return Err(e);
        }
    };

    if let Err(e) = fs::commit(&staged_key, &key_dest) {
        fs::discard(&staged_key);
        fs::discard(&staged_primary);
        return Err(Error::WriteFile {
            path: key_dest,
            source: e,
        });
    }

    if let Err(e) = fs::commit(&staged_primary, &primary_dest) {
        fs::discard(&staged_primary);
        return Err(Error::PartialPersist {
            written: key_dest,
            failed: primary_dest,
            source: e,
        });
    }

    tracing::info!(
        directory = %directory.display(),
        file = primary.name,
        key = key.name,
        "persisted artifact"
    );

    Ok(Persisted {
        primary: primary_dest,
        private_key: key_dest,
    })
}

/// A directory that artifacts are persisted into.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    directory: PathBuf,
}

impl ArtifactStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn persist(&self, files: &ArtifactFiles<'_>) -> Result<Persisted> {
        persist(&self.directory, files)
    }

    pub fn persist_root_ca(&self, ca: &Certificate) -> Result<Persisted> {
        self.persist(&ArtifactFiles::root_ca(ca))
    }

    pub fn persist_request(&self, csr: &CertificateRequest) -> Result<Persisted> {
        self.persist(&ArtifactFiles::request(csr)?)
    }

    pub fn persist_client_certificate(&self, cert: &Certificate, user: &str) -> Result<Persisted> {
        self.persist(&ArtifactFiles::client_certificate(cert, user)?)
    }
}
