use serde::{Deserialize, Serialize};

/// Directory object for ACME client self-configuration.
///
/// Only the endpoints needed to look up renewal information are modelled.
///
/// See [RFC 8555 §7.1.1] and [draft-ietf-acme-ari §4].
///
/// # Example JSON
///
/// ```json
/// {
///   "newNonce": "https://example.com/acme/new-nonce",
///   "newAccount": "https://example.com/acme/new-account",
///   "newOrder": "https://example.com/acme/new-order",
///   "renewalInfo": "https://example.com/acme/renewal-info",
///   "meta": {
///     "termsOfService": "https://example.com/acme/terms/2017-5-30"
///   }
/// }
/// ```
///
/// [RFC 8555 §7.1.1]: https://datatracker.ietf.org/doc/html/rfc8555#section-7.1.1
/// [draft-ietf-acme-ari §4]: https://datatracker.ietf.org/doc/html/draft-ietf-acme-ari#section-4
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Directory {
    /// URL for new nonce requests.
    pub new_nonce: String,

    /// URL for new account requests.
    pub new_account: String,

    /// URL for new order requests.
    pub new_order: String,

    /// Base URL of the renewal information resource.
    ///
    /// Absent when the server does not implement ACME Renewal Information (ARI).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renewal_info: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<DirectoryMeta>,
}

impl Directory {
    /// Returns the renewal information URL for a certificate ID.
    pub fn renewal_info_url(&self, cert_id: &str) -> Option<String> {
        let base = self.renewal_info.as_deref()?;
        Some(format!("{}/{cert_id}", base.trim_end_matches('/')))
    }
}

/// <https://datatracker.ietf.org/doc/html/rfc8555#section-9.7.6>
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryMeta {
    /// URL identifying the current terms of service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terms_of_service: Option<String>,

    /// URL locating a website providing more information about the ACME server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}
