//! The issuance capability consumed by the renewal flow.

use std::{error::Error as StdError, fmt, future::Future};

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::{
    api::RenewalInfo,
    cert::ExistingCertificate,
    request::{ObtainForCsrRequest, ObtainRequest},
};

/// Obtains certificates from an ACME provider.
///
/// Implementations run the complete order flow (authorizations, challenges, finalization,
/// download) and surface any failure as an error; the renewal flow never retries.
pub trait Issuer {
    /// Obtains a certificate for a list of domains.
    fn obtain(
        &self,
        request: ObtainRequest,
    ) -> impl Future<Output = eyre::Result<Resource>> + Send;

    /// Obtains a certificate for an operator-supplied CSR.
    fn obtain_for_csr(
        &self,
        request: ObtainForCsrRequest,
    ) -> impl Future<Output = eyre::Result<Resource>> + Send;

    /// Fetches the server's suggested renewal window for a certificate.
    ///
    /// See [`RenewalInfoClient`](crate::ari::RenewalInfoClient) for an implementation.
    fn renewal_info(
        &self,
        cert: &ExistingCertificate,
    ) -> impl Future<Output = Result<RenewalInfo, RenewalInfoError>> + Send;
}

/// Failure to look up renewal information.
#[derive(Debug)]
pub enum RenewalInfoError {
    /// The server does not advertise a renewal information endpoint.
    Unsupported,

    /// The lookup failed for any other reason.
    Other(eyre::Report),
}

impl fmt::Display for RenewalInfoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenewalInfoError::Unsupported => {
                f.write_str("the server does not advertise a renewal info endpoint")
            }
            RenewalInfoError::Other(err) => write!(f, "{err:#}"),
        }
    }
}

impl StdError for RenewalInfoError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            RenewalInfoError::Unsupported => None,
            RenewalInfoError::Other(err) => {
                let err: &(dyn StdError + 'static) = &**err;
                Some(err)
            }
        }
    }
}

impl From<eyre::Report> for RenewalInfoError {
    fn from(err: eyre::Report) -> Self {
        RenewalInfoError::Other(err)
    }
}

/// A newly issued certificate and everything needed to install it.
///
/// Produced by the [`Issuer`] and passed to the certificate store unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    /// The main domain the certificate is stored under.
    pub domain: String,

    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub cert_url: String,

    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub cert_stable_url: String,

    /// Private key in PEM format.
    ///
    /// Absent when the certificate was issued for an operator-supplied CSR.
    #[serde(skip)]
    pub private_key: Option<Zeroizing<String>>,

    /// Certificate in PEM format, possibly bundled with its issuer chain.
    #[serde(skip)]
    pub certificate: String,

    /// Issuer certificate in PEM format.
    #[serde(skip)]
    pub issuer_certificate: Option<String>,

    /// The CSR the certificate was issued for, in DER encoding.
    #[serde(skip)]
    pub csr: Option<Vec<u8>>,
}
