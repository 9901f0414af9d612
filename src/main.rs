// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

use ae_pki::{
    inspect_pem, read_pem_file, verify_signed_by, ArtifactStore, Certificate, CertificateRequest,
    Config, Error, Inspected, Persisted, Pki, Result,
};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

// ============================================================================
// CLI definitions
// ============================================================================

#[derive(Parser)]
#[command(name = "ae")]
#[command(about = "Command line client for the Aurae runtime")]
#[command(version)]
#[command(after_help = "\
EXAMPLES:
    ae pki create unsafe.aurae.io --dir ./pki                  # Root CA
    ae pki create unsafe.aurae.io --user christoph --dir ./pki # Client CSR
    ae pki create unsafe.aurae.io --user christoph \\
        --ca ./pki/ca.crt --ca-key ./pki/ca.key \\
        --csr ./pki/client.christoph.csr \\
        --csr-key ./pki/client.christoph.key --dir ./pki       # Sign client cert")]
struct Cli {
    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Path to the issuance policy (default: $AE_PKI_CONFIG or <config dir>/ae/pki.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create and inspect certificates
    #[command(subcommand)]
    Pki(PkiCommands),
}

#[derive(Subcommand)]
enum PkiCommands {
    /// Create a root CA, a client CSR, or sign a client certificate from a CSR
    Create {
        /// Domain the CA or client identity belongs to
        domain: String,

        /// Directory to write the generated files to
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Create a client CSR (or, with --ca, a client certificate) for this user
        #[arg(short, long)]
        user: Option<String>,

        /// CA certificate used to sign the CSR
        #[arg(long, requires = "ca_key", requires = "csr", requires = "user")]
        ca: Option<PathBuf>,

        /// Private key of the CA certificate
        #[arg(long, requires = "ca")]
        ca_key: Option<PathBuf>,

        /// CSR to sign
        #[arg(long, requires = "ca", requires = "csr_key")]
        csr: Option<PathBuf>,

        /// Private key of the CSR, stored alongside the signed certificate
        #[arg(long, requires = "csr")]
        csr_key: Option<PathBuf>,

        /// Do not print the result
        #[arg(short, long)]
        silent: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        output: OutputFormat,
    },

    /// Show the contents of a certificate or CSR
    Inspect {
        /// PEM file to inspect
        file: PathBuf,

        /// Verify the certificate's signature against this CA certificate
        #[arg(long)]
        ca: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        output: OutputFormat,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
    Toml,
}

impl OutputFormat {
    fn render<T: Serialize>(self, value: &T) -> Result<String> {
        match self {
            OutputFormat::Json => {
                serde_json::to_string_pretty(value).map_err(|e| Error::Render(e.to_string()))
            }
            OutputFormat::Yaml => {
                serde_yaml::to_string(value).map_err(|e| Error::Render(e.to_string()))
            }
            OutputFormat::Toml => {
                toml::to_string_pretty(value).map_err(|e| Error::Render(e.to_string()))
            }
        }
    }
}

/// Output helper that respects --quiet.
///
/// stdout carries the rendered artifact, so status lines go to stderr.
#[derive(Clone, Copy)]
struct Output {
    quiet: bool,
}

impl Output {
    fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    /// Print a status message (suppressed with --quiet)
    fn status(&self, msg: &str) {
        if !self.quiet {
            eprintln!("{}", msg);
        }
    }

    fn persisted(&self, persisted: &Persisted) {
        self.status(&format!("Wrote {}", persisted.primary.display()));
        self.status(&format!("Wrote {}", persisted.private_key.display()));
    }
}

fn main() {
    // Reset SIGPIPE to default behavior (exit) instead of panic
    // This prevents "broken pipe" panics when output is piped to tools like grep/head
    #[cfg(unix)]
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(quiet: bool, verbose: bool) {
    let default = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);
    let out = Output::new(cli.quiet);

    match cli.command {
        Commands::Pki(PkiCommands::Create {
            domain,
            dir,
            user,
            ca,
            ca_key,
            csr,
            csr_key,
            silent,
            output,
        }) => {
            let config_path = match cli.config {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&config_path)?;
            let inputs = CreateInputs {
                ca,
                ca_key,
                csr,
                csr_key,
            };
            cmd_create(
                config,
                &domain,
                user.as_deref(),
                inputs,
                dir.as_deref(),
                silent,
                output,
                out,
            )
        }
        Commands::Pki(PkiCommands::Inspect { file, ca, output }) => {
            cmd_inspect(&file, ca.as_deref(), output)
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

/// Files naming an existing CA and the CSR to sign with it.
struct CreateInputs {
    ca: Option<PathBuf>,
    ca_key: Option<PathBuf>,
    csr: Option<PathBuf>,
    csr_key: Option<PathBuf>,
}

fn required<'a>(path: &'a Option<PathBuf>, flag: &str) -> Result<&'a Path> {
    path.as_deref()
        .ok_or_else(|| Error::Config(format!("--ca requires {}", flag)))
}

fn print_result<T: Serialize>(value: &T, silent: bool, output: OutputFormat) -> Result<()> {
    if !silent {
        println!("{}", output.render(value)?);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_create(
    config: Config,
    domain: &str,
    user: Option<&str>,
    inputs: CreateInputs,
    dir: Option<&Path>,
    silent: bool,
    output: OutputFormat,
    out: Output,
) -> Result<()> {
    let mut pki = Pki::new(config);
    let store = dir.map(ArtifactStore::new);

    match (user, &inputs.ca) {
        (Some(user), Some(ca_path)) => {
            let ca = Certificate::new(
                read_pem_file(ca_path)?,
                read_pem_file(required(&inputs.ca_key, "--ca-key")?)?,
            );
            let csr = CertificateRequest::new(
                read_pem_file(required(&inputs.csr, "--csr")?)?,
                read_pem_file(required(&inputs.csr_key, "--csr-key")?)?,
                user,
            );

            let cert = pki.sign_client_certificate(&csr, &ca, user)?;
            if let Some(store) = &store {
                out.persisted(&store.persist_client_certificate(&cert, user)?);
            }
            print_result(&cert, silent, output)
        }
        (Some(user), None) => {
            let csr = pki.create_client_csr(domain, user)?;
            if let Some(store) = &store {
                out.persisted(&store.persist_request(&csr)?);
            }
            print_result(&csr, silent, output)
        }
        (None, _) => {
            let ca = pki.create_root_ca(domain)?;
            if let Some(store) = &store {
                out.persisted(&store.persist_root_ca(&ca)?);
            }
            print_result(&ca, silent, output)
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InspectReport {
    #[serde(flatten)]
    artifact: Inspected,
    #[serde(skip_serializing_if = "Option::is_none")]
    verified_by: Option<String>,
}

fn cmd_inspect(file: &Path, ca: Option<&Path>, output: OutputFormat) -> Result<()> {
    let pem = read_pem_file(file)?;
    let artifact = inspect_pem(&pem)?;

    let verified_by = match ca {
        Some(ca_path) => {
            let ca_pem = read_pem_file(ca_path)?;
            verify_signed_by(&pem, &ca_pem)?;
            Some(ca_path.display().to_string())
        }
        None => None,
    };

    let report = InspectReport {
        artifact,
        verified_by,
    };
    println!("{}", output.render(&report)?);
    Ok(())
}
