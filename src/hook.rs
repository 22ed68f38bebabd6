//! Post-renewal metadata and the operator hook.

use std::{collections::BTreeMap, process::Stdio, time::Duration};

use eyre::{eyre, WrapErr as _};
use tokio::process::Command;

use crate::{
    error::{Error, ErrorKind, Result, ResultExt as _},
    issuer::Resource,
    store::{CertificateStore, FileKind},
};

pub const ENV_ACCOUNT_EMAIL: &str = "ACME_ACCOUNT_EMAIL";
pub const ENV_CERT_DOMAIN: &str = "ACME_CERT_DOMAIN";
pub const ENV_CERT_PATH: &str = "ACME_CERT_PATH";
pub const ENV_CERT_KEY_PATH: &str = "ACME_CERT_KEY_PATH";
pub const ENV_ISSUER_CERT_PATH: &str = "ACME_ISSUER_CERT_PATH";
pub const ENV_CERT_PEM_PATH: &str = "ACME_CERT_PEM_PATH";
pub const ENV_CERT_PFX_PATH: &str = "ACME_CERT_PFX_PATH";

/// How long a hook may run before it is killed.
pub const DEFAULT_HOOK_TIMEOUT: Duration = Duration::from_secs(2 * 60);

/// Describes a completed renewal.
///
/// Exposed to the hook as environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenewalMetadata {
    vars: BTreeMap<String, String>,
}

impl RenewalMetadata {
    /// Collects the metadata of a certificate that has just been saved to `store`.
    ///
    /// `domain` is the renewal target (first requested domain or CSR main domain), which may
    /// differ from `resource.domain`.
    pub fn new<S: CertificateStore>(
        account_email: &str,
        domain: &str,
        resource: &Resource,
        store: &S,
    ) -> Self {
        let path = |kind| store.file_name(domain, kind).display().to_string();

        let mut vars = BTreeMap::new();
        vars.insert(ENV_ACCOUNT_EMAIL.to_owned(), account_email.to_owned());
        vars.insert(ENV_CERT_DOMAIN.to_owned(), domain.to_owned());
        vars.insert(ENV_CERT_PATH.to_owned(), path(FileKind::Certificate));
        vars.insert(ENV_CERT_KEY_PATH.to_owned(), path(FileKind::Key));

        if resource.issuer_certificate.is_some() {
            vars.insert(ENV_ISSUER_CERT_PATH.to_owned(), path(FileKind::Issuer));
        }

        if store.emits_pem() {
            vars.insert(ENV_CERT_PEM_PATH.to_owned(), path(FileKind::Pem));
        }

        if store.emits_pfx() {
            vars.insert(ENV_CERT_PFX_PATH.to_owned(), path(FileKind::Pfx));
        }

        RenewalMetadata { vars }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Iterates over the variables in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Runs an operator command after a successful renewal.
///
/// The command line is split on whitespace; no shell quoting is applied. The command inherits
/// the process environment plus the [`RenewalMetadata`] variables.
#[derive(Debug, Clone)]
pub struct CommandHook {
    command: String,
    timeout: Duration,
}

impl CommandHook {
    pub fn new(command: impl Into<String>) -> Self {
        CommandHook {
            command: command.into(),
            timeout: DEFAULT_HOOK_TIMEOUT,
        }
    }

    /// Sets how long the command may run.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Runs the command and waits for it to exit.
    ///
    /// A blank command line does nothing. Fails with [`ErrorKind::Hook`] when the command cannot
    /// be started, exits unsuccessfully, or exceeds the timeout.
    pub async fn run(&self, metadata: &RenewalMetadata) -> Result<()> {
        let mut parts = self.command.split_whitespace();

        let Some(program) = parts.next() else {
            return Ok(());
        };

        let mut cmd = Command::new(program);
        cmd.args(parts)
            .envs(metadata.iter())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        log::debug!("Running hook: {}", self.command);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(output) => output
                .wrap_err_with(|| format!("Could not start hook: {}", self.command))
                .kind(ErrorKind::Hook)?,

            Err(_) => {
                return Err(Error::msg(
                    ErrorKind::Hook,
                    format!(
                        "hook timed out after {}s: {}",
                        self.timeout.as_secs_f64(),
                        self.command
                    ),
                ));
            }
        };

        let mut combined = output.stdout;
        combined.extend_from_slice(&output.stderr);
        let combined = String::from_utf8_lossy(&combined);

        if !combined.trim().is_empty() {
            log::info!("{}", combined.trim_end());
        }

        if !output.status.success() {
            return Err(Error::new(
                ErrorKind::Hook,
                eyre!("hook {} exited with {}", self.command, output.status),
            ));
        }

        Ok(())
    }
}
