// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

//! Parse X.509 certificates and certificate signing requests back into plain
//! data, and check issuer signatures.

use crate::codec::{self, Artifact, PemTag};
use crate::error::{Error, Result};
use rsa::{BigUint, RsaPublicKey};
use serde::{Serialize, Serializer};
use std::path::Path;
use x509_parser::prelude::*;
use x509_parser::public_key::PublicKey;

/// Subject fields of a certificate or request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectInfo {
    pub common_name: Option<String>,
    pub organization: Option<String>,
    pub organizational_unit: Option<String>,
    pub locality: Option<String>,
    pub province: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertInfo {
    pub serial: String,
    pub subject: SubjectInfo,
    pub issuer: SubjectInfo,
    pub dns_names: Vec<String>,
    pub is_ca: bool,
    pub client_auth: bool,
    #[serde(serialize_with = "serialize_key_id")]
    pub subject_key_id: Option<Vec<u8>>,
    #[serde(serialize_with = "serialize_key_id")]
    pub authority_key_id: Option<Vec<u8>>,
    pub not_before_timestamp: i64,
    pub not_after_timestamp: i64,
    pub key_bits: Option<usize>,
    #[serde(skip)]
    pub rsa_public_key: Option<RsaPublicKey>,
}

impl CertInfo {
    pub fn common_name(&self) -> Option<&str> {
        self.subject.common_name.as_deref()
    }

    pub fn expiry_string(&self) -> String {
        match ::time::OffsetDateTime::from_unix_timestamp(self.not_after_timestamp) {
            Ok(dt) => format!("{}-{:02}-{:02}", dt.year(), dt.month() as u8, dt.day()),
            Err(_) => "Invalid date".to_string(),
        }
    }

    pub fn days_remaining(&self) -> i64 {
        let now = ::time::OffsetDateTime::now_utc();
        match ::time::OffsetDateTime::from_unix_timestamp(self.not_after_timestamp) {
            Ok(expiry) => (expiry - now).whole_days(),
            Err(_) => -1, // Treat invalid timestamps as expired
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsrInfo {
    pub subject: SubjectInfo,
    pub dns_names: Vec<String>,
    pub key_bits: Option<usize>,
    #[serde(skip)]
    pub rsa_public_key: Option<RsaPublicKey>,
}

impl CsrInfo {
    pub fn common_name(&self) -> Option<&str> {
        self.subject.common_name.as_deref()
    }
}

/// Either kind of parsed artifact, for inspection of arbitrary PEM input.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Inspected {
    Certificate(CertInfo),
    CertificateRequest(CsrInfo),
}

pub fn parse_cert_pem(pem_str: &str) -> Result<CertInfo> {
    let der = codec::decode(pem_str, PemTag::Certificate, Artifact::Certificate)?;
    parse_cert_der(&der, Artifact::Certificate)
}

pub fn parse_cert_der(der: &[u8], artifact: Artifact) -> Result<CertInfo> {
    let (_, cert) = X509Certificate::from_der(der).map_err(|e| Error::Format {
        artifact,
        reason: format!("invalid X.509 certificate: {}", e),
    })?;

    let mut dns_names = Vec::new();
    let mut is_ca = false;
    let mut client_auth = false;
    let mut subject_key_id = None;
    let mut authority_key_id = None;

    for ext in cert.extensions() {
        match ext.parsed_extension() {
            ParsedExtension::SubjectAlternativeName(san) => {
                dns_names.extend(dns_names_of(san));
            }
            ParsedExtension::BasicConstraints(bc) => {
                is_ca = bc.ca;
            }
            ParsedExtension::ExtendedKeyUsage(eku) => {
                client_auth = eku.client_auth;
            }
            ParsedExtension::SubjectKeyIdentifier(id) => {
                subject_key_id = Some(id.0.to_vec());
            }
            ParsedExtension::AuthorityKeyIdentifier(aki) => {
                authority_key_id = aki.key_identifier.as_ref().map(|id| id.0.to_vec());
            }
            _ => {}
        }
    }

    let (key_bits, rsa_public_key) = rsa_key_of(cert.public_key());

    Ok(CertInfo {
        serial: cert.raw_serial_as_string(),
        subject: subject_of(cert.subject()),
        issuer: subject_of(cert.issuer()),
        dns_names,
        is_ca,
        client_auth,
        subject_key_id,
        authority_key_id,
        not_before_timestamp: cert.validity().not_before.timestamp(),
        not_after_timestamp: cert.validity().not_after.timestamp(),
        key_bits,
        rsa_public_key,
    })
}

pub fn parse_csr_pem(pem_str: &str) -> Result<CsrInfo> {
    let der = codec::decode(pem_str, PemTag::CertificateRequest, Artifact::CertificateRequest)?;
    parse_csr_der(&der)
}

/// Parse a DER certificate signing request. The self-signature is not
/// checked here; see [`verify_csr_der`].
pub fn parse_csr_der(der: &[u8]) -> Result<CsrInfo> {
    let csr = csr_from_der(der)?;
    let info = &csr.certification_request_info;

    let mut dns_names = Vec::new();
    if let Some(extensions) = csr.requested_extensions() {
        for ext in extensions {
            if let ParsedExtension::SubjectAlternativeName(san) = ext {
                dns_names.extend(dns_names_of(san));
            }
        }
    }

    let (key_bits, rsa_public_key) = rsa_key_of(&info.subject_pki);

    Ok(CsrInfo {
        subject: subject_of(&info.subject),
        dns_names,
        key_bits,
        rsa_public_key,
    })
}

/// Verify the self-signature of a DER certificate signing request.
pub fn verify_csr_der(der: &[u8]) -> Result<()> {
    let csr = csr_from_der(der)?;
    csr.verify_signature()
        .map_err(|e| Error::CsrSignature(e.to_string()))
}

/// Check that `cert_pem` names `ca_pem` as its issuer and carries a valid
/// signature made with the CA's key.
pub fn verify_signed_by(cert_pem: &str, ca_pem: &str) -> Result<()> {
    let cert_der = codec::decode(cert_pem, PemTag::Certificate, Artifact::Certificate)?;
    let ca_der = codec::decode(ca_pem, PemTag::Certificate, Artifact::CaCertificate)?;

    let (_, cert) = X509Certificate::from_der(&cert_der).map_err(|e| Error::Format {
        artifact: Artifact::Certificate,
        reason: format!("invalid X.509 certificate: {}", e),
    })?;
    let (_, ca) = X509Certificate::from_der(&ca_der).map_err(|e| Error::Format {
        artifact: Artifact::CaCertificate,
        reason: format!("invalid X.509 certificate: {}", e),
    })?;

    if cert.issuer().as_raw() != ca.subject().as_raw() {
        return Err(Error::Verify(format!(
            "issuer '{}' does not match CA subject '{}'",
            cert.issuer(),
            ca.subject()
        )));
    }

    cert.verify_signature(Some(ca.public_key()))
        .map_err(|e| Error::Verify(e.to_string()))
}

/// Parse whichever supported artifact the first PEM block of `pem_str` holds.
pub fn inspect_pem(pem_str: &str) -> Result<Inspected> {
    match codec::peek_tag(pem_str).as_deref().and_then(PemTag::from_tag) {
        Some(PemTag::Certificate) => Ok(Inspected::Certificate(parse_cert_pem(pem_str)?)),
        Some(PemTag::CertificateRequest) => {
            Ok(Inspected::CertificateRequest(parse_csr_pem(pem_str)?))
        }
        _ => Err(Error::Format {
            artifact: Artifact::Certificate,
            reason: "expected a CERTIFICATE or CERTIFICATE REQUEST PEM block".into(),
        }),
    }
}

/// Read a PEM file into memory.
pub fn read_pem_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| Error::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })
}

pub(crate) fn csr_from_der(der: &[u8]) -> Result<X509CertificationRequest<'_>> {
    X509CertificationRequest::from_der(der)
        .map(|(_, csr)| csr)
        .map_err(|e| Error::Format {
            artifact: Artifact::CertificateRequest,
            reason: format!("invalid certificate signing request: {}", e),
        })
}

fn dns_names_of(san: &SubjectAlternativeName<'_>) -> Vec<String> {
    san.general_names
        .iter()
        .filter_map(|name| match name {
            GeneralName::DNSName(dns) => Some(dns.to_string()),
            _ => None,
        })
        .collect()
}

fn rsa_key_of(spki: &SubjectPublicKeyInfo<'_>) -> (Option<usize>, Option<RsaPublicKey>) {
    match spki.parsed() {
        Ok(PublicKey::RSA(rsa)) => {
            let key = RsaPublicKey::new(
                BigUint::from_bytes_be(rsa.modulus),
                BigUint::from_bytes_be(rsa.exponent),
            )
            .ok();
            (Some(rsa.key_size()), key)
        }
        _ => (None, None),
    }
}

fn subject_of(name: &X509Name<'_>) -> SubjectInfo {
    SubjectInfo {
        common_name: first_value(name.iter_common_name()),
        organization: first_value(name.iter_organization()),
        organizational_unit: first_value(name.iter_organizational_unit()),
        locality: first_value(name.iter_locality()),
        province: first_value(name.iter_state_or_province()),
        country: first_value(name.iter_country()),
    }
}

fn first_value<'a, 'b: 'a>(
    mut iter: impl Iterator<Item = &'a AttributeTypeAndValue<'b>>,
) -> Option<String> {
    iter.next()
        .and_then(|attr| attr.as_str().ok())
        .map(String::from)
}

/// Colon separated uppercase hex, as printed by openssl.
pub fn hex_colon(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":")
}

fn serialize_key_id<S: Serializer>(
    value: &Option<Vec<u8>>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match value {
        Some(bytes) => serializer.serialize_some(&hex_colon(bytes)),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::pki::test_pki;

    #[test]
    fn test_read_pem_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ca.crt");
        let ca = test_pki(19).create_root_ca("my.domain.com").unwrap();
        std::fs::write(&path, &ca.certificate).unwrap();

        let pem = read_pem_file(&path).unwrap();
        assert_eq!(parse_cert_pem(&pem).unwrap().common_name(), Some("my.domain.com"));

        let err = read_pem_file(&dir.path().join("missing.crt")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("missing.crt"));
    }

    #[test]
    fn test_parse_ca_cert() {
        let mut pki = test_pki(11);
        let ca = pki.create_root_ca("my.domain.com").unwrap();

        let info = parse_cert_pem(&ca.certificate).unwrap();

        assert_eq!(info.common_name(), Some("my.domain.com"));
        assert_eq!(info.dns_names, vec!["my.domain.com".to_string()]);
        assert!(info.is_ca);
        assert!(!info.client_auth);
        assert!(info.days_remaining() >= 9998);
        assert_eq!(info.subject, info.issuer);
    }

    #[test]
    fn test_expiry_string() {
        let mut pki = test_pki(12);
        let ca = pki.create_root_ca("my.domain.com").unwrap();
        let info = parse_cert_pem(&ca.certificate).unwrap();

        let expiry = info.expiry_string();
        // Should be in YYYY-MM-DD format
        assert_eq!(expiry.len(), 10);
        assert_eq!(expiry.chars().nth(4), Some('-'));
        assert_eq!(expiry.chars().nth(7), Some('-'));
    }

    #[test]
    fn test_inspect_dispatches_on_tag() {
        let mut pki = test_pki(13);
        let ca = pki.create_root_ca("my.domain.com").unwrap();
        let csr = pki.create_client_csr("my.domain.com", "alice").unwrap();

        assert!(matches!(
            inspect_pem(&ca.certificate).unwrap(),
            Inspected::Certificate(_)
        ));
        match inspect_pem(&csr.csr).unwrap() {
            Inspected::CertificateRequest(info) => {
                assert_eq!(info.common_name(), Some("alice.my.domain.com"));
            }
            other => panic!("unexpected: {other:?}"),
        }

        let err = inspect_pem(&ca.private_key).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn test_verify_signed_by_rejects_foreign_ca() {
        let mut pki = test_pki(14);
        let ca = pki.create_root_ca("my.domain.com").unwrap();
        let other = pki.create_root_ca("other.domain.com").unwrap();

        assert!(verify_signed_by(&ca.certificate, &ca.certificate).is_ok());
        let err = verify_signed_by(&ca.certificate, &other.certificate).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_parse_rejects_non_x509_der() {
        let pem = codec::encode(PemTag::Certificate, b"garbage");
        let err = parse_cert_pem(&pem).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn test_hex_colon() {
        assert_eq!(hex_colon(&[0x0a, 0xff, 0x00]), "0A:FF:00");
        assert_eq!(hex_colon(&[]), "");
    }
}
