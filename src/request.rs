//! Renewal request construction.
//!
//! A renewal is requested either for a list of domains or for an operator-supplied CSR, never
//! both. The two variants share the validity, chain and authorization options.

use eyre::WrapErr as _;
use time::OffsetDateTime;

use crate::{
    cert::{parse_private_key, Csr, ExistingCertificate, PrivateKey},
    error::{ErrorKind, Result, ResultExt as _},
    store::{CertificateStore, FileKind},
};

/// Operator options that shape the renewal request.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Reuse the stored private key instead of generating a new one.
    ///
    /// Only applies to domain-based renewals.
    pub reuse_key: bool,

    /// Do not bundle the issuer certificate with the new certificate.
    pub no_bundle: bool,

    /// Request the OCSP must-staple extension.
    pub must_staple: bool,

    /// Requested `notBefore` of the new certificate.
    pub not_before: Option<OffsetDateTime>,

    /// Requested `notAfter` of the new certificate.
    pub not_after: Option<OffsetDateTime>,

    /// Prefer the chain whose issuer has this common name, if the CA offers several.
    pub preferred_chain: Option<String>,

    /// Relinquish authorizations even when the order succeeds.
    pub always_deactivate_authorizations: bool,
}

/// Request for a certificate covering a list of domains.
#[derive(Debug, Clone, Default)]
pub struct ObtainRequest {
    pub domains: Vec<String>,

    /// Key to certify; a fresh key is generated by the issuer when absent.
    pub private_key: Option<PrivateKey>,

    pub must_staple: bool,
    pub not_before: Option<OffsetDateTime>,
    pub not_after: Option<OffsetDateTime>,
    pub bundle: bool,
    pub preferred_chain: Option<String>,
    pub always_deactivate_authorizations: bool,

    /// ARI certificate ID of the certificate being replaced.
    pub replaces_cert_id: Option<String>,
}

/// Request for a certificate matching an operator-supplied CSR.
#[derive(Debug, Clone, Default)]
pub struct ObtainForCsrRequest {
    /// The CSR in DER encoding.
    pub csr: Vec<u8>,

    /// Only honored by issuers that rebuild the CSR's extensions.
    pub must_staple: bool,

    pub not_before: Option<OffsetDateTime>,
    pub not_after: Option<OffsetDateTime>,
    pub bundle: bool,
    pub preferred_chain: Option<String>,
    pub always_deactivate_authorizations: bool,

    /// ARI certificate ID of the certificate being replaced.
    pub replaces_cert_id: Option<String>,
}

/// The request built for one renewal.
#[derive(Debug, Clone)]
pub enum RenewalRequest {
    Domains(ObtainRequest),
    Csr(ObtainForCsrRequest),
}

/// Merges requested domains into the domains of the existing certificate.
///
/// Existing domains keep their order; requested domains that are not already present are
/// appended in the order given. Names are compared exactly, without case or IDNA normalization.
pub fn merge_domains(existing: &[String], requested: &[String]) -> Vec<String> {
    let mut merged = existing.to_vec();

    for domain in requested {
        if !merged.contains(domain) {
            merged.push(domain.clone());
        }
    }

    merged
}

/// Builds a domain-based request renewing `cert`.
///
/// With [`RequestOptions::reuse_key`] the stored key for `domain` is loaded; a missing or
/// unreadable key fails with [`ErrorKind::KeyReuse`].
pub fn domain_request<S: CertificateStore>(
    store: &S,
    domain: &str,
    cert: &ExistingCertificate,
    requested: &[String],
    options: &RequestOptions,
    replaces_cert_id: Option<String>,
) -> Result<ObtainRequest> {
    let private_key = if options.reuse_key {
        let pem = store
            .read_file(domain, FileKind::Key)
            .wrap_err_with(|| format!("Error while loading the private key for domain {domain}"))
            .kind(ErrorKind::KeyReuse)?;

        let key = parse_private_key(&pem)
            .wrap_err_with(|| format!("Error while parsing the private key for domain {domain}"))
            .kind(ErrorKind::KeyReuse)?;

        log::debug!("[{domain}] Reusing {} private key", key.algorithm());

        Some(key)
    } else {
        None
    };

    Ok(ObtainRequest {
        domains: merge_domains(&cert.domains(), requested),
        private_key,
        must_staple: options.must_staple,
        not_before: options.not_before,
        not_after: options.not_after,
        bundle: !options.no_bundle,
        preferred_chain: options.preferred_chain.clone(),
        always_deactivate_authorizations: options.always_deactivate_authorizations,
        replaces_cert_id: replaces_cert_id.filter(|id| !id.is_empty()),
    })
}

/// Builds a CSR-based request.
pub fn csr_request(
    csr: &Csr,
    options: &RequestOptions,
    replaces_cert_id: Option<String>,
) -> ObtainForCsrRequest {
    ObtainForCsrRequest {
        csr: csr.der().to_vec(),
        must_staple: options.must_staple,
        not_before: options.not_before,
        not_after: options.not_after,
        bundle: !options.no_bundle,
        preferred_chain: options.preferred_chain.clone(),
        always_deactivate_authorizations: options.always_deactivate_authorizations,
        replaces_cert_id: replaces_cert_id.filter(|id| !id.is_empty()),
    }
}
