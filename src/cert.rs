// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

use crate::ca::CertificateAuthority;
use crate::codec::{self, Artifact, PemTag};
use crate::config::{validate_days, Config};
use crate::csr::CertificateRequest;
use crate::error::{Error, Result};
use crate::identity::{validate_domain, validate_user};
use crate::keygen::{self, KeyPair};
use crate::x509::{self, CertInfo};
use rand_core::CryptoRngCore;
use rcgen::{
    CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose, IsCa, KeyIdMethod,
    KeyUsagePurpose, SanType, SubjectPublicKeyInfo,
};
use serde::{Deserialize, Serialize};
use x509_parser::x509::X509Name;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A PEM certificate together with its PKCS#1 PEM private key.
///
/// Used both for root CAs and for signed client certificates.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub certificate: String,
    pub private_key: String,
}

impl Certificate {
    pub fn new(certificate: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            certificate: certificate.into(),
            private_key: private_key.into(),
        }
    }

    /// Parse the certificate half.
    pub fn info(&self) -> Result<CertInfo> {
        x509::parse_cert_pem(&self.certificate)
    }

    /// Check that both blocks decode and that the key belongs to the
    /// certificate.
    pub fn validate(&self) -> Result<()> {
        let info = self.info()?;
        let key = KeyPair::from_pkcs1_pem(&self.private_key, Artifact::PrivateKey)?;
        if info.rsa_public_key.as_ref() != Some(&key.public_key()) {
            return Err(Error::KeyMismatch {
                key: Artifact::PrivateKey,
                subject: Artifact::Certificate,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for Certificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Certificate")
            .field("certificate", &self.certificate)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

/// Returns a warning message if a certificate valid for `days` would outlive the CA.
fn check_ca_expiry_warning(ca: &CertInfo, days: u32) -> Option<String> {
    let ca_days_remaining = ca.days_remaining();
    if i64::from(days) > ca_days_remaining {
        Some(format!(
            "Certificate validity ({} days) exceeds CA's remaining validity ({} days). \
             The certificate will become invalid when the CA expires.",
            days, ca_days_remaining
        ))
    } else {
        None
    }
}

/// Sign a client certificate for `user` from `csr` using `ca`.
///
/// The request's self-signature is verified before its public key is
/// trusted. Only the subject and DNS names are taken from the request; key
/// usage, extended key usage, validity and key identifiers are set here.
pub fn sign_client_certificate<R: CryptoRngCore + ?Sized>(
    config: &Config,
    rng: &mut R,
    csr: &CertificateRequest,
    ca: &Certificate,
    user: &str,
) -> Result<Certificate> {
    validate_user(user)?;
    validate_days("client_days", config.client_days)?;

    let authority = CertificateAuthority::load(ca)?;

    let csr_der = codec::decode(
        &csr.csr,
        PemTag::CertificateRequest,
        Artifact::CertificateRequest,
    )?;
    x509::verify_csr_der(&csr_der)?;
    let request = x509::parse_csr_der(&csr_der)?;
    let public_key = request
        .rsa_public_key
        .clone()
        .ok_or_else(|| Error::UnsupportedKey {
            artifact: Artifact::CertificateRequest,
            reason: "only RSA keys can be signed".into(),
        })?;

    // The issued certificate carries this key.
    let key = KeyPair::from_pkcs1_pem(&csr.private_key, Artifact::RequestPrivateKey)?;
    if key.public_key() != public_key {
        return Err(Error::KeyMismatch {
            key: Artifact::RequestPrivateKey,
            subject: Artifact::CertificateRequest,
        });
    }

    // Requested extensions other than the DNS names are ignored.
    let parsed = x509::csr_from_der(&csr_der)?;
    let subject = &parsed.certification_request_info.subject;
    let distinguished_name = distinguished_name_of(subject)?;
    let request_key =
        SubjectPublicKeyInfo::from_der(parsed.certification_request_info.subject_pki.raw)?;

    let mut dns_names = Vec::with_capacity(request.dns_names.len());
    for name in &request.dns_names {
        validate_domain(name)?;
        dns_names.push(SanType::DnsName(name.clone().try_into()?));
    }

    if let Some(warning) = check_ca_expiry_warning(authority.info(), config.client_days) {
        tracing::warn!("{}", warning);
    }

    let serial = keygen::generate_serial(rng)?;

    let mut params = CertificateParams::default();
    params.distinguished_name = distinguished_name;
    params.subject_alt_names = dns_names;
    params.is_ca = IsCa::ExplicitNoCa;
    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyEncipherment,
    ];
    params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ClientAuth];
    params.serial_number = Some(keygen::to_serial_number(&serial));
    params.key_identifier_method =
        KeyIdMethod::PreSpecified(keygen::key_identifier(&public_key, config.key_id)?);
    params.use_authority_key_identifier_extension = true;

    let now = time::OffsetDateTime::now_utc();
    params.not_before = now;
    params.not_after = now + time::Duration::days(i64::from(config.client_days));

    let cert = params.signed_by(&request_key, authority.issuer())?;

    tracing::info!(
        user,
        subject = request.common_name().unwrap_or_default(),
        serial = %serial,
        days = config.client_days,
        "signed client certificate"
    );

    Ok(Certificate {
        certificate: codec::encode(PemTag::Certificate, cert.der().as_ref()),
        private_key: csr.private_key.clone(),
    })
}

/// Copy a request's subject attribute by attribute, keeping their order.
fn distinguished_name_of(name: &X509Name<'_>) -> Result<DistinguishedName> {
    let malformed = |reason: &str| Error::Format {
        artifact: Artifact::CertificateRequest,
        reason: format!("invalid subject: {}", reason),
    };

    let mut dn = DistinguishedName::new();
    for attr in name.iter_attributes() {
        let oid: Vec<u64> = attr
            .attr_type()
            .iter()
            .ok_or_else(|| malformed("attribute type out of range"))?
            .collect();
        let value = attr
            .as_str()
            .map_err(|_| malformed("attribute value is not a string"))?;
        dn.push(DnType::from_oid(&oid), value);
    }
    Ok(dn)
}
