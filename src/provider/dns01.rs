//! `dns-01` challenge helpers.
//!
//! See [RFC 8555 §8.4].
//!
//! [RFC 8555 §8.4]: https://datatracker.ietf.org/doc/html/rfc8555#section-8.4

use std::time::Duration;

use base64::prelude::*;
use sha2::{Digest as _, Sha256};

pub const DEFAULT_PROPAGATION_TIMEOUT: Duration = Duration::from_secs(60);

pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(2);

/// TXT record TTL in seconds.
pub const DEFAULT_TTL: u32 = 120;

const CHALLENGE_LABEL: &str = "_acme-challenge";

/// Where and what to publish for a `dns-01` challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeInfo {
    /// Fully qualified name of the TXT record, with trailing dot.
    pub fqdn: String,

    /// TXT record value.
    pub value: String,
}

impl ChallengeInfo {
    pub fn new(domain: &str, key_auth: &str) -> Self {
        let domain = un_fqdn(domain.strip_prefix("*.").unwrap_or(domain));

        ChallengeInfo {
            fqdn: to_fqdn(&format!("{CHALLENGE_LABEL}.{domain}")),
            value: BASE64_URL_SAFE_NO_PAD.encode(Sha256::digest(key_auth)),
        }
    }
}

/// Appends the trailing dot if missing.
pub fn to_fqdn(name: &str) -> String {
    if name.ends_with('.') {
        name.to_owned()
    } else {
        format!("{name}.")
    }
}

/// Strips the trailing dot, if any.
pub fn un_fqdn(name: &str) -> &str {
    name.strip_suffix('.').unwrap_or(name)
}

/// Guesses the zone of a name as its last two labels.
///
/// Does not consult DNS, so zones below public suffixes such as `co.uk` must be configured
/// explicitly.
pub fn guess_zone(fqdn: &str) -> String {
    let name = un_fqdn(fqdn);
    let labels = name.rsplitn(3, '.').take(2).collect::<Vec<_>>();

    match labels.as_slice() {
        [tld, sld] => format!("{sld}.{tld}"),
        _ => name.to_owned(),
    }
}
