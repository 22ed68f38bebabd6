//! Certificate storage capability and a filesystem implementation.
//!
//! # Directory Structure
//!
//! ```text
//! <root>/certificates/
//! ├── example.com.crt         # certificate (bundle)
//! ├── example.com.issuer.crt  # issuer certificate
//! ├── example.com.key         # private key
//! ├── example.com.pem         # certificate + private key, if enabled
//! └── example.com.json        # resource metadata
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use eyre::{eyre, WrapErr as _};

use crate::{cert::ExistingCertificate, issuer::Resource};

/// The files kept for each certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Certificate,
    Issuer,
    Key,
    Pem,
    Pfx,
    Resource,
}

impl FileKind {
    /// File name suffix, including the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            FileKind::Certificate => ".crt",
            FileKind::Issuer => ".issuer.crt",
            FileKind::Key => ".key",
            FileKind::Pem => ".pem",
            FileKind::Pfx => ".pfx",
            FileKind::Resource => ".json",
        }
    }
}

/// Read/write access to stored certificates, keyed by domain.
///
/// A single [`save_resource`](CertificateStore::save_resource) call is expected to be atomic
/// from the caller's point of view.
pub trait CertificateStore {
    /// Reads a stored PEM bundle, leaf certificate first.
    fn read_certificate(
        &self,
        domain: &str,
        kind: FileKind,
    ) -> eyre::Result<Vec<ExistingCertificate>> {
        let pem = self.read_file(domain, kind)?;
        ExistingCertificate::chain_from_pem(&pem)
    }

    /// Reads the raw contents of a stored file.
    fn read_file(&self, domain: &str, kind: FileKind) -> eyre::Result<Vec<u8>>;

    /// Persists a newly issued certificate.
    fn save_resource(&self, resource: &Resource) -> eyre::Result<()>;

    /// Path of a stored file, whether or not it exists.
    fn file_name(&self, domain: &str, kind: FileKind) -> PathBuf;

    /// Whether a combined certificate and key `.pem` file is written.
    fn emits_pem(&self) -> bool {
        false
    }

    /// Whether a PKCS #12 `.pfx` file is written.
    fn emits_pfx(&self) -> bool {
        false
    }
}

/// Stores certificates as files in a single directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    pem: bool,
}

impl FileStore {
    /// Opens a store under `path`, creating `<path>/certificates` if needed.
    pub fn new(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let root = path.as_ref().join("certificates");

        fs::create_dir_all(&root)
            .wrap_err_with(|| format!("Could not create directory {}", root.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt as _;
            fs::set_permissions(&root, fs::Permissions::from_mode(0o700))?;
        }

        log::debug!("Certificate storage: {}", root.display());

        Ok(FileStore { root, pem: false })
    }

    /// Also write a combined certificate and key `.pem` file.
    ///
    /// Resources without a private key (CSR renewals) cannot be saved by such a store.
    pub fn with_pem(mut self, pem: bool) -> Self {
        self.pem = pem;
        self
    }

    /// The directory certificates are written to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn write(&self, domain: &str, kind: FileKind, contents: &[u8]) -> eyre::Result<()> {
        let path = self.file_name(domain, kind);
        let tmp = path.with_file_name(format!(
            ".{}.tmp",
            path.file_name()
                .map(|name| name.to_string_lossy())
                .unwrap_or_default()
        ));

        fs::write(&tmp, contents)
            .wrap_err_with(|| format!("Unable to write file {}", tmp.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt as _;

            if matches!(kind, FileKind::Key | FileKind::Pem) {
                fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))?;
            }
        }

        fs::rename(&tmp, &path)
            .wrap_err_with(|| format!("Unable to write file {}", path.display()))
    }
}

impl CertificateStore for FileStore {
    fn read_file(&self, domain: &str, kind: FileKind) -> eyre::Result<Vec<u8>> {
        let path = self.file_name(domain, kind);
        fs::read(&path).wrap_err_with(|| format!("Unable to read file {}", path.display()))
    }

    fn save_resource(&self, resource: &Resource) -> eyre::Result<()> {
        let domain = resource.domain.as_str();

        if self.pem && resource.private_key.is_none() {
            return Err(eyre!(
                "Unable to save PEM without private key for domain {domain}. Are you using a CSR?"
            ));
        }

        self.write(domain, FileKind::Certificate, resource.certificate.as_bytes())?;

        if let Some(issuer) = &resource.issuer_certificate {
            self.write(domain, FileKind::Issuer, issuer.as_bytes())?;
        }

        if let Some(private_key) = &resource.private_key {
            self.write(domain, FileKind::Key, private_key.as_bytes())?;

            if self.pem {
                let mut pem = zeroize::Zeroizing::new(resource.certificate.as_bytes().to_vec());
                pem.extend_from_slice(private_key.as_bytes());
                self.write(domain, FileKind::Pem, &pem)?;
            }
        }

        let json = serde_json::to_vec_pretty(resource).context("Unable to marshal resource")?;
        self.write(domain, FileKind::Resource, &json)?;

        log::info!("[{domain}] Certificate saved to {}", self.root.display());

        Ok(())
    }

    fn file_name(&self, domain: &str, kind: FileKind) -> PathBuf {
        self.root
            .join(format!("{}{}", sanitized_domain(domain), kind.extension()))
    }

    fn emits_pem(&self) -> bool {
        self.pem
    }
}

/// Makes a domain safe to use as a file name.
fn sanitized_domain(domain: &str) -> String {
    domain.replace('*', "_").replace(':', "-")
}
