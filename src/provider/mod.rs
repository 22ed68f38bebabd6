//! Challenge providers.
//!
//! A provider proves control of a domain by publishing a challenge response (e.g. a DNS TXT
//! record) and removing it again once the authorization has been validated.

use std::{future::Future, time::Duration};

pub mod dns01;
pub mod mdns;

/// Publishes and removes challenge responses.
///
/// Implementations keep per-token state so that several challenges can be in flight at once.
pub trait Provider {
    /// Publishes the response for `token`.
    fn present(
        &self,
        domain: &str,
        token: &str,
        key_auth: &str,
    ) -> impl Future<Output = eyre::Result<()>> + Send;

    /// Removes the response published for `token`.
    ///
    /// Fails for tokens that were never presented. Clean-up failures should be logged rather than
    /// treated as fatal.
    fn clean_up(
        &self,
        domain: &str,
        token: &str,
        key_auth: &str,
    ) -> impl Future<Output = eyre::Result<()>> + Send;

    /// How long to wait for the response to become visible, and how often to check.
    fn timeout(&self) -> (Duration, Duration) {
        (
            dns01::DEFAULT_PROPAGATION_TIMEOUT,
            dns01::DEFAULT_POLLING_INTERVAL,
        )
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }
}

/// Optional behaviors a provider declares up front.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Solve one authorization at a time, pausing for the given duration between them.
    pub sequential: Option<Duration>,
}
