//! Request signature providers.
//!
//! Both platforms reject comment-list calls that do not carry an opaque
//! signature computed over the query string and the user agent. The
//! algorithms themselves live outside this crate: a provider either shells
//! out to a pre-built signer program or returns a fixed vector.

use std::fmt;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::DEFAULT_SIGNER_TIMEOUT_SECS;
use crate::error::{CommentFerryError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureScheme {
    /// Douyin web API, appended as `a_bogus`.
    ABogus,
    /// TikTok web API, appended as `X-Bogus`.
    XBogus,
}

impl SignatureScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureScheme::ABogus => "a_bogus",
            SignatureScheme::XBogus => "x_bogus",
        }
    }

    pub fn env_var(&self) -> &'static str {
        match self {
            SignatureScheme::ABogus => "COMMENTFERRY_A_BOGUS_SIGNER",
            SignatureScheme::XBogus => "COMMENTFERRY_X_BOGUS_SIGNER",
        }
    }
}

impl fmt::Display for SignatureScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait SignatureProvider: Send + Sync {
    fn scheme(&self) -> SignatureScheme;

    /// Short human-readable description for status output.
    fn describe(&self) -> String;

    /// Sign `query` (everything after `?`, already percent-encoded) as sent
    /// with `user_agent`.
    async fn sign(&self, query: &str, user_agent: &str) -> Result<String>;
}

/// Runs an external signer: `<program> <args..> --query <q> --user-agent <ua>`.
/// The signature is whatever the program prints to stdout.
#[derive(Debug, Clone)]
pub struct SidecarSigner {
    scheme: SignatureScheme,
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl SidecarSigner {
    pub fn new(scheme: SignatureScheme, program: &str, args: &[&str], timeout: Duration) -> Self {
        Self {
            scheme,
            program: program.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            timeout,
        }
    }

    /// Build from a whitespace-separated command line such as
    /// `node /opt/signers/a_bogus_cli.js`.
    pub fn from_command_line(
        scheme: SignatureScheme,
        command_line: &str,
        timeout: Duration,
    ) -> Option<Self> {
        let mut parts = command_line.split_whitespace();
        let program = parts.next()?;
        let args: Vec<&str> = parts.collect();
        Some(Self::new(scheme, program, &args, timeout))
    }
}

#[async_trait]
impl SignatureProvider for SidecarSigner {
    fn scheme(&self) -> SignatureScheme {
        self.scheme
    }

    fn describe(&self) -> String {
        format!("sidecar: {} {}", self.program, self.args.join(" "))
            .trim_end()
            .to_string()
    }

    async fn sign(&self, query: &str, user_agent: &str) -> Result<String> {
        use tokio::process::Command;

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg("--query")
            .arg(query)
            .arg("--user-agent")
            .arg(user_agent)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Ensure the child process is terminated if we time out and drop the future.
        cmd.kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| {
            CommentFerryError::signature(self.scheme, format!("failed to spawn signer: {}", e))
        })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(r) => r.map_err(|e| {
                CommentFerryError::signature(self.scheme, format!("signer failed: {}", e))
            })?,
            Err(_) => {
                return Err(CommentFerryError::signature(
                    self.scheme,
                    format!("signer timeout ({:?})", self.timeout),
                ));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CommentFerryError::signature(
                self.scheme,
                format!("signer exited with {}: {}", output.status, stderr.trim()),
            ));
        }

        let signature = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if signature.is_empty() {
            return Err(CommentFerryError::signature(
                self.scheme,
                "signer produced no output",
            ));
        }

        tracing::debug!(scheme = %self.scheme, sig_len = signature.len(), "query signed");
        Ok(signature)
    }
}

/// Returns the same signature for every input.
#[derive(Debug, Clone)]
pub struct FixedSigner {
    scheme: SignatureScheme,
    signature: String,
}

impl FixedSigner {
    pub fn new(scheme: SignatureScheme, signature: &str) -> Self {
        Self {
            scheme,
            signature: signature.to_string(),
        }
    }
}

#[async_trait]
impl SignatureProvider for FixedSigner {
    fn scheme(&self) -> SignatureScheme {
        self.scheme
    }

    fn describe(&self) -> String {
        "fixed".to_string()
    }

    async fn sign(&self, _query: &str, _user_agent: &str) -> Result<String> {
        Ok(self.signature.clone())
    }
}

/// Stand-in for a scheme with no signer configured. Every call fails.
#[derive(Debug, Clone)]
pub struct UnconfiguredSigner {
    scheme: SignatureScheme,
}

impl UnconfiguredSigner {
    pub fn new(scheme: SignatureScheme) -> Self {
        Self { scheme }
    }
}

#[async_trait]
impl SignatureProvider for UnconfiguredSigner {
    fn scheme(&self) -> SignatureScheme {
        self.scheme
    }

    fn describe(&self) -> String {
        format!("unconfigured (set {})", self.scheme.env_var())
    }

    async fn sign(&self, _query: &str, _user_agent: &str) -> Result<String> {
        Err(CommentFerryError::signature(
            self.scheme,
            format!("no signer configured; set {}", self.scheme.env_var()),
        ))
    }
}

/// Process-wide signer set. Built once at startup and shared read-only.
#[derive(Clone)]
pub struct Signers {
    pub a_bogus: Arc<dyn SignatureProvider>,
    pub x_bogus: Arc<dyn SignatureProvider>,
}

impl Signers {
    pub fn new(a_bogus: Arc<dyn SignatureProvider>, x_bogus: Arc<dyn SignatureProvider>) -> Self {
        Self { a_bogus, x_bogus }
    }

    pub fn fixed(a_bogus: &str, x_bogus: &str) -> Self {
        Self::new(
            Arc::new(FixedSigner::new(SignatureScheme::ABogus, a_bogus)),
            Arc::new(FixedSigner::new(SignatureScheme::XBogus, x_bogus)),
        )
    }

    pub fn from_env(timeout_secs: Option<u64>) -> Self {
        let timeout = Duration::from_secs(timeout_secs.unwrap_or(DEFAULT_SIGNER_TIMEOUT_SECS));
        let load = |scheme: SignatureScheme| -> Arc<dyn SignatureProvider> {
            let sidecar = std::env::var(scheme.env_var())
                .ok()
                .and_then(|cmd| SidecarSigner::from_command_line(scheme, &cmd, timeout));
            match sidecar {
                Some(signer) => {
                    tracing::info!(scheme = %scheme, signer = %signer.describe(), "signer loaded");
                    Arc::new(signer)
                }
                None => {
                    tracing::warn!(scheme = %scheme, "no signer configured");
                    Arc::new(UnconfiguredSigner::new(scheme))
                }
            }
        };

        Self::new(load(SignatureScheme::ABogus), load(SignatureScheme::XBogus))
    }

    pub fn for_scheme(&self, scheme: SignatureScheme) -> Arc<dyn SignatureProvider> {
        match scheme {
            SignatureScheme::ABogus => self.a_bogus.clone(),
            SignatureScheme::XBogus => self.x_bogus.clone(),
        }
    }
}
