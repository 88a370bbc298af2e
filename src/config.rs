//! Runtime connection settings.
//!
//! Resolved from the conventional `DOCKER_*` environment variables, overridden by
//! command-line flags, and handed to the `docker` CLI as global arguments.

use std::path::{Path, PathBuf};

use crate::error::{Result, VizError};

pub const DEFAULT_ENDPOINT: &str = "unix:///var/run/docker.sock";

/// Client certificate material for a TLS-verified endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsFiles {
    pub ca_cert: PathBuf,
    pub cert: PathBuf,
    pub key: PathBuf,
}

impl TlsFiles {
    /// The `ca.pem`, `cert.pem` and `key.pem` files of a certificate directory.
    pub fn from_dir(dir: &Path) -> Self {
        Self {
            ca_cert: dir.join("ca.pem"),
            cert: dir.join("cert.pem"),
            key: dir.join("key.pem"),
        }
    }
}

/// Flag-level overrides, all optional.
#[derive(Debug, Clone, Default)]
pub struct ConnectionOverrides {
    pub host: Option<String>,
    pub tls_verify: bool,
    pub tls_ca_cert: Option<PathBuf>,
    pub tls_cert: Option<PathBuf>,
    pub tls_key: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Explicitly configured endpoint; `None` leaves the runtime client's default.
    pub host: Option<String>,
    pub tls: Option<TlsFiles>,
}

impl ConnectionConfig {
    /// Resolve against the process environment.
    pub fn resolve(overrides: &ConnectionOverrides) -> Result<Self> {
        Self::resolve_with(overrides, |key| std::env::var(key).ok())
    }

    /// Resolve with an explicit environment lookup.
    pub fn resolve_with<F>(overrides: &ConnectionOverrides, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = overrides
            .host
            .clone()
            .or_else(|| env("DOCKER_HOST"))
            .filter(|host| !host.is_empty());

        let tls_verify =
            overrides.tls_verify || env("DOCKER_TLS_VERIFY").is_some_and(|v| v == "1");

        let tls = if tls_verify {
            let cert_path = env("DOCKER_CERT_PATH").filter(|p| !p.is_empty());
            match (
                cert_path,
                &overrides.tls_ca_cert,
                &overrides.tls_cert,
                &overrides.tls_key,
            ) {
                (Some(dir), _, _, _) => Some(TlsFiles::from_dir(Path::new(&dir))),
                (None, Some(ca_cert), Some(cert), Some(key)) => Some(TlsFiles {
                    ca_cert: ca_cert.clone(),
                    cert: cert.clone(),
                    key: key.clone(),
                }),
                _ => {
                    return Err(VizError::Config(
                        "TLS Verification requested but certs not specified".to_string(),
                    ))
                }
            }
        } else {
            None
        };

        Ok(Self { host, tls })
    }

    /// Endpoint used in messages.
    pub fn endpoint(&self) -> &str {
        self.host.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    /// Global arguments for the `docker` CLI.
    pub fn docker_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(host) = &self.host {
            args.push("--host".to_string());
            args.push(host.clone());
        }
        if let Some(tls) = &self.tls {
            args.push("--tlsverify".to_string());
            for (flag, path) in [
                ("--tlscacert", &tls.ca_cert),
                ("--tlscert", &tls.cert),
                ("--tlskey", &tls.key),
            ] {
                args.push(flag.to_string());
                args.push(path.display().to_string());
            }
        }
        args
    }
}
