// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

//! Root CA, client CSR and client certificate issuance for Aurae.
//!
//! ```rust,no_run
//! use ae_pki::{ArtifactStore, Config, Pki};
//!
//! let config = Config::load(&Config::default_path()?)?;
//! let mut pki = Pki::new(config);
//!
//! let ca = pki.create_root_ca("unsafe.aurae.io")?;
//! let csr = pki.create_client_csr("unsafe.aurae.io", "christoph")?;
//! let cert = pki.sign_client_certificate(&csr, &ca, "christoph")?;
//!
//! let store = ArtifactStore::new("./pki");
//! store.persist_root_ca(&ca)?;
//! store.persist_client_certificate(&cert, "christoph")?;
//! # Ok::<(), ae_pki::Error>(())
//! ```

/// Root Certificate Authority creation.
pub mod ca;
/// Certificates and client certificate signing.
pub mod cert;
/// PEM encoding and decoding.
pub mod codec;
/// Configuration handling.
pub mod config;
/// Client certificate signing requests.
pub mod csr;
/// Error types.
pub mod error;
/// Filesystem utilities.
pub mod fs;
/// Domain and user name validation.
pub mod identity;
/// RSA keys and serial numbers.
pub mod keygen;
/// Issuance facade.
pub mod pki;
/// Artifact persistence.
pub mod store;
/// X.509 certificate parsing.
pub mod x509;

pub use ca::create_root_ca;
pub use cert::{sign_client_certificate, Certificate};
pub use codec::{Artifact, PemTag};
pub use config::{Config, KeyIdStrategy, SubjectPolicy, CONFIG_ENV};
pub use csr::{create_client_csr, CertificateRequest};
pub use error::{Error, ErrorKind, Result};
pub use keygen::{generate_key, generate_serial, KeyPair};
pub use pki::Pki;
pub use store::{persist, ArtifactFiles, ArtifactStore, Persisted};
pub use x509::{
    inspect_pem, parse_cert_pem, parse_csr_pem, read_pem_file, verify_signed_by, CertInfo, CsrInfo,
    Inspected, SubjectInfo,
};
