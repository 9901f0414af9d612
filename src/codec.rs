// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

//! PEM encoding and tag-checked decoding of the artifacts this crate handles.

use crate::error::{Error, Result};
use pem::{EncodeConfig, LineEnding, Pem};
use std::fmt;

/// PEM block types produced and accepted by the issuer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PemTag {
    Certificate,
    RsaPrivateKey,
    CertificateRequest,
}

impl PemTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            PemTag::Certificate => "CERTIFICATE",
            PemTag::RsaPrivateKey => "RSA PRIVATE KEY",
            PemTag::CertificateRequest => "CERTIFICATE REQUEST",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "CERTIFICATE" => Some(PemTag::Certificate),
            "RSA PRIVATE KEY" => Some(PemTag::RsaPrivateKey),
            "CERTIFICATE REQUEST" => Some(PemTag::CertificateRequest),
            _ => None,
        }
    }
}

impl fmt::Display for PemTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which input or output an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    CaCertificate,
    CaPrivateKey,
    CertificateRequest,
    RequestPrivateKey,
    Certificate,
    PrivateKey,
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Artifact::CaCertificate => "CA certificate",
            Artifact::CaPrivateKey => "CA private key",
            Artifact::CertificateRequest => "certificate signing request",
            Artifact::RequestPrivateKey => "certificate signing request private key",
            Artifact::Certificate => "certificate",
            Artifact::PrivateKey => "private key",
        };
        f.write_str(name)
    }
}

/// Wrap DER bytes in a PEM block with LF line endings.
pub fn encode(tag: PemTag, der: &[u8]) -> String {
    let block = Pem::new(tag.as_str(), der.to_vec());
    pem::encode_config(&block, EncodeConfig::new().set_line_ending(LineEnding::LF))
}

/// Decode the first PEM block of `input` and return its DER contents.
///
/// Anything after the first block is ignored. The block's label must equal
/// `expected`; otherwise a tag mismatch naming `artifact` is returned.
pub fn decode(input: &str, expected: PemTag, artifact: Artifact) -> Result<Vec<u8>> {
    let block = pem::parse(input).map_err(|e| Error::Format {
        artifact,
        reason: format!("no valid PEM block: {}", e),
    })?;

    if block.tag() != expected.as_str() {
        return Err(Error::PemTagMismatch {
            artifact,
            expected,
            found: block.tag().to_string(),
        });
    }

    Ok(block.into_contents())
}

/// Label of the first PEM block in `input`, if any.
pub fn peek_tag(input: &str) -> Option<String> {
    pem::parse(input).ok().map(|block| block.tag().to_string())
}
