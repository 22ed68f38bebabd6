//! ACME Renewal Information (ARI) lookups.
//!
//! See [draft-ietf-acme-ari].
//!
//! [draft-ietf-acme-ari]: https://datatracker.ietf.org/doc/html/draft-ietf-acme-ari

use std::time::Duration;

use eyre::WrapErr as _;

use crate::{
    api::{self, RenewalInfo},
    cert::ExistingCertificate,
    issuer::RenewalInfoError,
    req::{http_client, req_get, req_handle_error},
};

const LETSENCRYPT_URL: &str = "https://acme-v02.api.letsencrypt.org/directory";
const LETSENCRYPT_STAGING_URL: &str = "https://acme-staging-v02.api.letsencrypt.org/directory";

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Enumeration of known ACME API directories.
#[derive(Debug, Clone)]
pub enum DirectoryUrl<'a> {
    /// The main Let's Encrypt directory.
    LetsEncrypt,

    /// The staging Let's Encrypt directory.
    LetsEncryptStaging,

    /// Provide an arbitrary directory URL to connect to.
    Other(&'a str),
}

impl<'a> DirectoryUrl<'a> {
    fn to_url(&self) -> &str {
        match self {
            DirectoryUrl::LetsEncrypt => LETSENCRYPT_URL,
            DirectoryUrl::LetsEncryptStaging => LETSENCRYPT_STAGING_URL,
            DirectoryUrl::Other(url) => url,
        }
    }
}

/// Fetches suggested renewal windows from an ACME server.
///
/// Suitable for backing [`Issuer::renewal_info`](crate::issuer::Issuer::renewal_info). Windows
/// are fetched on every call and never cached.
#[derive(Debug, Clone)]
pub struct RenewalInfoClient {
    client: reqwest::Client,
    directory: api::Directory,
}

impl RenewalInfoClient {
    /// Fetches the server's directory.
    pub async fn fetch(url: DirectoryUrl<'_>) -> eyre::Result<Self> {
        let client = http_client(HTTP_TIMEOUT)?;

        let res = req_get(&client, url.to_url()).await?;
        let res = req_handle_error(res).await?;
        let directory = res
            .json::<api::Directory>()
            .await
            .context("Unable to parse the ACME directory")?;

        Ok(RenewalInfoClient { client, directory })
    }

    /// Uses an already fetched directory.
    pub fn from_directory(directory: api::Directory) -> eyre::Result<Self> {
        Ok(RenewalInfoClient {
            client: http_client(HTTP_TIMEOUT)?,
            directory,
        })
    }

    pub fn directory(&self) -> &api::Directory {
        &self.directory
    }

    /// Whether the server advertises a renewal information endpoint.
    pub fn is_supported(&self) -> bool {
        self.directory.renewal_info.is_some()
    }

    /// Fetches the suggested renewal window for `cert`.
    pub async fn renewal_info(
        &self,
        cert: &ExistingCertificate,
    ) -> Result<RenewalInfo, RenewalInfoError> {
        if !self.is_supported() {
            return Err(RenewalInfoError::Unsupported);
        }

        let cert_id = cert.ari_cert_id()?;
        let url = self
            .directory
            .renewal_info_url(&cert_id)
            .ok_or(RenewalInfoError::Unsupported)?;

        let res = req_get(&self.client, &url).await?;
        let res = req_handle_error(res).await.map_err(eyre::Report::from)?;

        if let Some(retry_after) = res.headers().get(reqwest::header::RETRY_AFTER) {
            log::debug!("renewalInfo Retry-After: {retry_after:?}");
        }

        let info = res
            .json::<RenewalInfo>()
            .await
            .context("Unable to parse renewal info")?;

        Ok(info)
    }
}
