//! Renewing certificates obtained from ACME (Automatic Certificate Management Environment)
//! providers such as [Let's Encrypt](https://letsencrypt.org/).
//!
//! A renewal attempt loads the installed certificate, decides whether it is due, optionally waits,
//! asks an [`Issuer`] for a replacement, saves it to a [`CertificateStore`], and runs a hook.
//!
//! # Usage
//!
//! ```no_run
//! # async fn run(issuer: impl acme_renew::Issuer) -> eyre::Result<()> {
//! use acme_renew::{FileStore, Outcome, RenewOptions, Renewer, Target};
//!
//! let store = FileStore::new(".acme")?;
//! let renewer = Renewer::new(issuer, store, "admin@example.com");
//!
//! let target = Target::from_inputs(&["example.com".to_owned()], None)?;
//!
//! match renewer.renew(&target, &RenewOptions::default()).await? {
//!     Outcome::Skipped => {}
//!     Outcome::Renewed(metadata) => println!("renewed {:?}", metadata.get("ACME_CERT_DOMAIN")),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # When Renewal Happens
//!
//! By default a certificate is renewed once 30 days or fewer remain. Servers that implement
//! [ACME Renewal Information] can suggest a renewal window instead; a renewal time selected from
//! that window takes precedence. See [`decision`].
//!
//! # Rate Limits
//!
//! Unattended runs sleep for a random delay of up to eight minutes before issuance so that
//! renewals scheduled at the same time on many hosts do not hit the CA at once. See [`Jitter`].
//!
//! [ACME Renewal Information]: https://datatracker.ietf.org/doc/html/draft-ietf-acme-ari

#![deny(rust_2018_idioms, nonstandard_style, future_incompatible)]

mod cert;
mod error;
mod req;

pub mod api;
pub mod ari;
pub mod decision;
pub mod hook;
pub mod issuer;
pub mod jitter;
pub mod provider;
pub mod renew;
pub mod request;
pub mod store;


pub use crate::{
    ari::{DirectoryUrl, RenewalInfoClient},
    cert::{parse_private_key, Csr, ExistingCertificate, PrivateKey},
    error::{Error, ErrorKind, Result},
    hook::{CommandHook, RenewalMetadata},
    issuer::{Issuer, RenewalInfoError, Resource},
    jitter::Jitter,
    renew::{Outcome, RenewOptions, Renewer, Target},
    request::RequestOptions,
    store::{CertificateStore, FileKind, FileStore},
};
