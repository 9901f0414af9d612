// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

use crate::codec::{Artifact, PemTag};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),

    #[error("Invalid RSA key size {bits}: {reason}")]
    InvalidKeySize { bits: usize, reason: String },

    #[error("Certificate generation failed: {0}")]
    CertGen(#[from] rcgen::Error),

    #[error("Invalid {artifact}: {reason}")]
    Format { artifact: Artifact, reason: String },

    #[error("Invalid {artifact}: expected PEM block '{expected}', found '{found}'")]
    PemTagMismatch {
        artifact: Artifact,
        expected: PemTag,
        found: String,
    },

    #[error("Signature of the certificate signing request does not verify: {0}")]
    CsrSignature(String),

    #[error("{key} does not match the public key of the {subject}")]
    KeyMismatch { key: Artifact, subject: Artifact },

    #[error("{0} is not a CA certificate")]
    NotCa(Artifact),

    #[error("Unsupported key algorithm in {artifact}: {reason}")]
    UnsupportedKey { artifact: Artifact, reason: String },

    #[error("Certificate verification failed: {0}")]
    Verify(String),

    #[error("Invalid domain '{domain}': {reason}")]
    InvalidDomain { domain: String, reason: String },

    #[error("Invalid user '{user}': {reason}")]
    InvalidUser { user: String, reason: String },

    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(
        "Partial persistence: {written} was written but {failed} could not be: {source}\n\
         The directory is inconsistent; remove both files and retry."
    )]
    PartialPersist {
        written: PathBuf,
        failed: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid path (non-UTF8): {0}")]
    InvalidPath(PathBuf),

    #[error("Invalid validity period: {0}")]
    InvalidDays(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to render output: {0}")]
    Render(String),
}

/// Coarse classification of [`Error`], so callers can tell a corrupt input
/// file apart from a pair of files that do not belong together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Crypto,
    Format,
    Validation,
    Io,
    Config,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Crypto(_) | Error::InvalidKeySize { .. } | Error::CertGen(_) => ErrorKind::Crypto,
            Error::Format { .. } | Error::PemTagMismatch { .. } => ErrorKind::Format,
            Error::CsrSignature(_)
            | Error::KeyMismatch { .. }
            | Error::NotCa(_)
            | Error::UnsupportedKey { .. }
            | Error::Verify(_)
            | Error::InvalidDomain { .. }
            | Error::InvalidUser { .. } => ErrorKind::Validation,
            Error::CreateDir { .. }
            | Error::ReadFile { .. }
            | Error::WriteFile { .. }
            | Error::PartialPersist { .. }
            | Error::InvalidPath(_)
            | Error::Render(_) => ErrorKind::Io,
            Error::InvalidDays(_) | Error::Config(_) => ErrorKind::Config,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
