// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

use crate::codec::{self, Artifact, PemTag};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::identity::client_identity;
use crate::keygen::{self, KeyPair};
use crate::x509::{self, CsrInfo};
use rand_core::CryptoRngCore;
use rcgen::{CertificateParams, SanType};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A PEM certificate signing request, its PEM private key and the user it
/// was created for.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct CertificateRequest {
    pub csr: String,
    pub private_key: String,
    pub user: String,
}

impl CertificateRequest {
    pub fn new(
        csr: impl Into<String>,
        private_key: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            csr: csr.into(),
            private_key: private_key.into(),
            user: user.into(),
        }
    }

    /// Parse the request half. The self-signature is not checked.
    pub fn info(&self) -> Result<CsrInfo> {
        x509::parse_csr_pem(&self.csr)
    }

    /// Check the request's self-signature and that the private key belongs
    /// to it.
    pub fn validate(&self) -> Result<()> {
        let der = codec::decode(
            &self.csr,
            PemTag::CertificateRequest,
            Artifact::CertificateRequest,
        )?;
        x509::verify_csr_der(&der)?;

        let info = x509::parse_csr_der(&der)?;
        let key = KeyPair::from_pkcs1_pem(&self.private_key, Artifact::RequestPrivateKey)?;
        if info.rsa_public_key.as_ref() != Some(&key.public_key()) {
            return Err(Error::KeyMismatch {
                key: Artifact::RequestPrivateKey,
                subject: Artifact::CertificateRequest,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for CertificateRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateRequest")
            .field("csr", &self.csr)
            .field("private_key", &"[REDACTED]")
            .field("user", &self.user)
            .finish()
    }
}

/// Create a key pair and a signing request for `<user>.<domain>`.
pub fn create_client_csr<R: CryptoRngCore + ?Sized>(
    config: &Config,
    rng: &mut R,
    domain: &str,
    user: &str,
) -> Result<CertificateRequest> {
    let identity = client_identity(domain, user)?;
    let key_pair = keygen::generate_key(rng, config.client_key_bits)?;

    let mut params = CertificateParams::default();
    params.distinguished_name = config.subject.distinguished_name(&identity);
    params.subject_alt_names = vec![SanType::DnsName(identity.clone().try_into()?)];

    let request = params.serialize_request(&key_pair.signing_key()?)?;

    tracing::info!(
        identity = %identity,
        bits = key_pair.bits(),
        "created certificate signing request"
    );

    Ok(CertificateRequest {
        csr: codec::encode(PemTag::CertificateRequest, request.der().as_ref()),
        private_key: key_pair.to_pkcs1_pem()?,
        user: user.to_string(),
    })
}
