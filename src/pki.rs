// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

use crate::ca;
use crate::cert::{self, Certificate};
use crate::config::Config;
use crate::csr::{self, CertificateRequest};
use crate::error::Result;
use rand_core::{CryptoRngCore, OsRng};

/// Issuance policy plus the random source used for keys and serial numbers.
///
/// `Pki::new` draws from the operating system; tests and callers that need
/// reproducible output can supply any CSPRNG through [`Pki::with_rng`].
#[derive(Debug, Clone)]
pub struct Pki<R = OsRng> {
    config: Config,
    rng: R,
}

impl Pki<OsRng> {
    pub fn new(config: Config) -> Self {
        Self { config, rng: OsRng }
    }
}

impl Default for Pki<OsRng> {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl<R: CryptoRngCore> Pki<R> {
    pub fn with_rng(config: Config, rng: R) -> Self {
        Self { config, rng }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Create a self-signed root CA for `domain`.
    pub fn create_root_ca(&mut self, domain: &str) -> Result<Certificate> {
        ca::create_root_ca(&self.config, &mut self.rng, domain)
    }

    /// Create a key pair and signing request for `<user>.<domain>`.
    pub fn create_client_csr(&mut self, domain: &str, user: &str) -> Result<CertificateRequest> {
        csr::create_client_csr(&self.config, &mut self.rng, domain, user)
    }

    /// Sign `csr` with `ca`, producing a client certificate for `user`.
    pub fn sign_client_certificate(
        &mut self,
        csr: &CertificateRequest,
        ca: &Certificate,
        user: &str,
    ) -> Result<Certificate> {
        cert::sign_client_certificate(&self.config, &mut self.rng, csr, ca, user)
    }
}

/// A reproducible issuer with 2048-bit client keys.
#[cfg(test)]
pub(crate) fn test_pki(seed: u64) -> Pki<rand_chacha::ChaCha20Rng> {
    use rand_core::SeedableRng;

    let config = Config {
        client_key_bits: 2048,
        ..Config::default()
    };
    Pki::with_rng(config, rand_chacha::ChaCha20Rng::seed_from_u64(seed))
}
