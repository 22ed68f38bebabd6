//! Whether and when to renew.
//!
//! Two signals are combined: the server's suggested renewal window (ACME Renewal Information, ARI)
//! and a local threshold of days remaining before expiry. A concrete ARI renewal time always wins
//! over the threshold; when ARI is disabled, unsupported, failing, or says "not yet", the
//! threshold decides.

use std::time::Duration;

use time::OffsetDateTime;

use crate::{
    api::RenewalInfo,
    cert::ExistingCertificate,
    error::{Error, ErrorKind, Result},
    issuer::{Issuer, RenewalInfoError},
};

/// Default number of days before expiry at which a certificate is renewed.
pub const DEFAULT_DAYS: i64 = 30;

/// Inputs to the renewal decision besides the certificate itself.
#[derive(Debug, Clone)]
pub struct DecisionOptions {
    /// Renew when this many days or fewer remain. Negative values always renew.
    pub days: i64,

    /// Do not consult the renewal information endpoint.
    pub ari_disable: bool,

    /// The longest wait that is acceptable for an ARI-selected renewal time.
    pub ari_wait_to_renew: Duration,
}

impl Default for DecisionOptions {
    fn default() -> Self {
        DecisionOptions {
            days: DEFAULT_DAYS,
            ari_disable: false,
            ari_wait_to_renew: Duration::ZERO,
        }
    }
}

/// Outcome of the renewal decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// No renewal needed.
    Skip,

    /// Renew immediately.
    RenewNow,

    /// Renew once the given instant has been reached.
    RenewAfter(OffsetDateTime),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub verdict: Verdict,

    /// ARI certificate ID linking the renewal to the certificate it replaces.
    ///
    /// Only set when renewal information was successfully retrieved.
    pub replaces_cert_id: Option<String>,
}

/// Decides whether `cert` should be renewed at `now`.
///
/// A CA certificate fails with [`ErrorKind::Precondition`] before any request is made. Renewal
/// information lookup failures are logged and otherwise ignored.
pub async fn decide<I: Issuer>(
    issuer: &I,
    cert: &ExistingCertificate,
    domain: &str,
    options: &DecisionOptions,
    now: OffsetDateTime,
) -> Result<Decision> {
    ensure_not_ca(cert, domain)?;

    let mut replaces_cert_id = None;

    if !options.ari_disable {
        if let Some(info) = fetch_renewal_info(issuer, cert, domain).await {
            replaces_cert_id = match cert.ari_cert_id() {
                Ok(cert_id) => Some(cert_id),
                Err(err) => {
                    log::warn!("[{domain}] acme: unable to build the ARI certificate ID: {err}");
                    None
                }
            };

            if let Some(renew_at) = renewal_time(&info, domain, now, options.ari_wait_to_renew) {
                let verdict = if renew_at > now {
                    Verdict::RenewAfter(renew_at)
                } else {
                    Verdict::RenewNow
                };

                return Ok(Decision {
                    verdict,
                    replaces_cert_id,
                });
            }
        }
    }

    let verdict = if needs_renewal(cert, domain, options.days, now) {
        Verdict::RenewNow
    } else {
        Verdict::Skip
    };

    Ok(Decision {
        verdict,
        replaces_cert_id,
    })
}

/// Day-threshold check.
///
/// Returns true when `days` is negative or no more than `days` whole days remain.
pub fn needs_renewal(
    cert: &ExistingCertificate,
    domain: &str,
    days: i64,
    now: OffsetDateTime,
) -> bool {
    if days < 0 {
        return true;
    }

    let remaining = cert.days_remaining(now);

    if remaining > days {
        log::info!(
            "[{domain}] The certificate expires in {remaining} days, the number of days defined \
            to perform the renewal is {days}: no renewal."
        );
        return false;
    }

    true
}

fn ensure_not_ca(cert: &ExistingCertificate, domain: &str) -> Result<()> {
    if cert.is_ca() {
        return Err(Error::msg(
            ErrorKind::Precondition,
            format!("[{domain}] Certificate bundle starts with a CA certificate"),
        ));
    }

    Ok(())
}

async fn fetch_renewal_info<I: Issuer>(
    issuer: &I,
    cert: &ExistingCertificate,
    domain: &str,
) -> Option<RenewalInfo> {
    match issuer.renewal_info(cert).await {
        Ok(info) => Some(info),

        Err(err @ RenewalInfoError::Unsupported) => {
            log::warn!("[{domain}] acme: {err}");
            None
        }

        Err(err) => {
            log::warn!("[{domain}] acme: calling renewal info endpoint: {err}");
            None
        }
    }
}

fn renewal_time(
    info: &RenewalInfo,
    domain: &str,
    now: OffsetDateTime,
    willing_to_wait: Duration,
) -> Option<OffsetDateTime> {
    let Some(renew_at) = info.should_renew_at(now, willing_to_wait) else {
        log::info!("[{domain}] acme: renewalInfo endpoint indicates that renewal is not needed");
        return None;
    };

    log::info!("[{domain}] acme: renewalInfo endpoint indicates that renewal is needed");

    if let Some(url) = &info.explanation_url {
        log::info!("[{domain}] acme: renewalInfo endpoint provided an explanation: {url}");
    }

    Some(renew_at)
}
