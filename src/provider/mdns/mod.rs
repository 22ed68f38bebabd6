//! `dns-01` provider for the mDNS API (<https://mdns.nic.md>).
//!
//! # Environment
//!
//! | Variable                   | Required | Meaning                          |
//! |----------------------------|----------|----------------------------------|
//! | `MDNS_AUTH_EMAIL`          | yes      | account email                    |
//! | `MDNS_AUTH_KEY`            | yes      | API key                          |
//! | `MDNS_BASE_URL`            | yes      | API base URL                     |
//! | `MDNS_PROPAGATION_TIMEOUT` | no       | seconds to wait for propagation  |
//! | `MDNS_POLLING_INTERVAL`    | no       | seconds between propagation checks |
//! | `MDNS_HTTP_TIMEOUT`        | no       | HTTP request timeout in seconds  |
//! | `MDNS_TTL`                 | no       | TXT record TTL in seconds        |
//!
//! The record API takes no TTL; `MDNS_TTL` is parsed and kept in [`Config::ttl`] but not sent.

use std::{collections::HashMap, time::Duration};

use eyre::{eyre, WrapErr as _};
use parking_lot::Mutex;

use self::{client::Client, types::Record};
use crate::{
    provider::{
        dns01::{self, ChallengeInfo},
        Provider,
    },
    req::http_client,
};

mod client;
mod types;

pub use self::types::Response;

pub const ENV_AUTH_EMAIL: &str = "MDNS_AUTH_EMAIL";
pub const ENV_AUTH_KEY: &str = "MDNS_AUTH_KEY";
pub const ENV_BASE_URL: &str = "MDNS_BASE_URL";
pub const ENV_PROPAGATION_TIMEOUT: &str = "MDNS_PROPAGATION_TIMEOUT";
pub const ENV_POLLING_INTERVAL: &str = "MDNS_POLLING_INTERVAL";
pub const ENV_HTTP_TIMEOUT: &str = "MDNS_HTTP_TIMEOUT";
pub const ENV_TTL: &str = "MDNS_TTL";

pub const DEFAULT_BASE_URL: &str = "https://mdns.nic.md/api/";

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Provider configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub auth_email: String,
    pub auth_key: String,

    /// Empty means [`DEFAULT_BASE_URL`].
    pub base_url: String,

    /// Zone records are created in. Guessed from the challenge name when absent.
    pub zone: Option<String>,

    pub propagation_timeout: Duration,
    pub polling_interval: Duration,
    pub http_timeout: Duration,

    /// TXT record TTL in seconds.
    pub ttl: u32,
}

impl Config {
    pub fn new(auth_email: impl Into<String>, auth_key: impl Into<String>) -> Self {
        Config {
            auth_email: auth_email.into(),
            auth_key: auth_key.into(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            zone: None,
            propagation_timeout: dns01::DEFAULT_PROPAGATION_TIMEOUT,
            polling_interval: dns01::DEFAULT_POLLING_INTERVAL,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            ttl: dns01::DEFAULT_TTL,
        }
    }

    /// Reads the configuration from the process environment.
    pub fn from_env() -> eyre::Result<Self> {
        Config::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which maps variable names to values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> eyre::Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|val| !val.is_empty())
                .ok_or_else(|| eyre!("mdns: some credentials information are missing: {key}"))
        };

        let seconds = |key: &str, default: Duration| -> eyre::Result<Duration> {
            match lookup(key).filter(|val| !val.is_empty()) {
                Some(val) => {
                    let secs = val
                        .trim()
                        .parse::<u64>()
                        .wrap_err_with(|| format!("mdns: invalid value for {key}: {val}"))?;
                    Ok(Duration::from_secs(secs))
                }
                None => Ok(default),
            }
        };

        let mut config = Config::new(required(ENV_AUTH_EMAIL)?, required(ENV_AUTH_KEY)?);
        config.base_url = required(ENV_BASE_URL)?;
        config.propagation_timeout = seconds(ENV_PROPAGATION_TIMEOUT, config.propagation_timeout)?;
        config.polling_interval = seconds(ENV_POLLING_INTERVAL, config.polling_interval)?;
        config.http_timeout = seconds(ENV_HTTP_TIMEOUT, config.http_timeout)?;

        if let Some(val) = lookup(ENV_TTL).filter(|val| !val.is_empty()) {
            config.ttl = val
                .trim()
                .parse()
                .wrap_err_with(|| format!("mdns: invalid value for {ENV_TTL}: {val}"))?;
        }

        Ok(config)
    }
}

/// Solves `dns-01` challenges by creating TXT records through the mDNS API.
#[derive(Debug)]
pub struct MdnsProvider {
    config: Config,
    client: Client,

    /// Record ID created for each challenge token.
    records: Mutex<HashMap<String, i64>>,
}

impl MdnsProvider {
    pub fn new(mut config: Config) -> eyre::Result<Self> {
        if config.auth_email.is_empty() || config.auth_key.is_empty() {
            return Err(eyre!("mdns: credentials missing"));
        }

        if config.base_url.is_empty() {
            config.base_url = DEFAULT_BASE_URL.to_owned();
        }

        let client = Client::new(
            http_client(config.http_timeout)?,
            &config.base_url,
            &config.auth_email,
            &config.auth_key,
        );

        Ok(MdnsProvider {
            config,
            client,
            records: Mutex::new(HashMap::new()),
        })
    }

    pub fn from_env() -> eyre::Result<Self> {
        MdnsProvider::new(Config::from_env()?)
    }

    fn zone(&self, fqdn: &str) -> String {
        match &self.config.zone {
            Some(zone) => dns01::un_fqdn(zone).to_owned(),
            None => dns01::guess_zone(fqdn),
        }
    }
}

impl Provider for MdnsProvider {
    async fn present(&self, domain: &str, token: &str, key_auth: &str) -> eyre::Result<()> {
        let info = ChallengeInfo::new(domain, key_auth);
        let zone = self.zone(&info.fqdn);

        let record = Record {
            name: dns01::un_fqdn(&info.fqdn).to_owned(),
            _type: "TXT".to_owned(),
            content: format!("\"{}\"", info.value),
            ..Default::default()
        };

        let res = self
            .client
            .add_record(&zone, &record)
            .await
            .wrap_err_with(|| format!("mdns: could not create TXT record for {domain}"))?;

        let id = res
            .results
            .first()
            .map(|record| record.id)
            .ok_or_else(|| eyre!("mdns: no record returned for {}", info.fqdn))?;

        log::debug!("[{domain}] mdns: created record {id} in zone {zone}");

        self.records.lock().insert(token.to_owned(), id);

        Ok(())
    }

    async fn clean_up(&self, domain: &str, token: &str, key_auth: &str) -> eyre::Result<()> {
        let info = ChallengeInfo::new(domain, key_auth);
        let zone = self.zone(&info.fqdn);

        let id = self
            .records
            .lock()
            .get(token)
            .copied()
            .ok_or_else(|| eyre!("mdns: unknown ref for {}", info.fqdn))?;

        self.client
            .remove_record(&zone, id)
            .await
            .wrap_err_with(|| format!("mdns: could not remove TXT record for {domain}"))?;

        self.records.lock().remove(token);

        Ok(())
    }

    fn timeout(&self) -> (Duration, Duration) {
        (self.config.propagation_timeout, self.config.polling_interval)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::{provider::Capabilities, test};

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect::<HashMap<_, _>>();

        move |key| vars.get(key).cloned()
    }

    fn provider(server: &test::TestServer, key: &str) -> MdnsProvider {
        let mut config = Config::new(test::MDNS_EMAIL, key);
        config.base_url = server.url.clone();
        MdnsProvider::new(config).unwrap()
    }

    #[test]
    fn test_config_from_lookup() {
        let config = Config::from_lookup(lookup(&[
            (ENV_AUTH_EMAIL, "me@a.md"),
            (ENV_AUTH_KEY, "secret"),
            (ENV_BASE_URL, "https://mdns.example/api"),
            (ENV_POLLING_INTERVAL, "5"),
            (ENV_TTL, "300"),
        ]))
        .unwrap();

        assert_eq!(config.ttl, 300);

        assert_eq!(config.auth_email, "me@a.md");
        assert_eq!(config.base_url, "https://mdns.example/api");
        assert_eq!(config.polling_interval, Duration::from_secs(5));
        assert_eq!(config.propagation_timeout, dns01::DEFAULT_PROPAGATION_TIMEOUT);
    }

    #[test]
    fn test_config_missing_credentials() {
        let err = Config::from_lookup(lookup(&[(ENV_AUTH_EMAIL, "me@a.md")])).unwrap_err();
        assert!(err.to_string().contains(ENV_AUTH_KEY));
    }

    #[test]
    fn test_config_invalid_duration() {
        let res = Config::from_lookup(lookup(&[
            (ENV_AUTH_EMAIL, "me@a.md"),
            (ENV_AUTH_KEY, "secret"),
            (ENV_BASE_URL, "https://mdns.example/api"),
            (ENV_HTTP_TIMEOUT, "soon"),
        ]));
        assert!(res.is_err());

        let res = Config::from_lookup(lookup(&[
            (ENV_AUTH_EMAIL, "me@a.md"),
            (ENV_AUTH_KEY, "secret"),
            (ENV_BASE_URL, "https://mdns.example/api"),
            (ENV_TTL, "-1"),
        ]));
        assert!(res.is_err());
    }

    #[test]
    fn test_new_requires_credentials() {
        assert!(MdnsProvider::new(Config::new("", "secret")).is_err());
    }

    #[tokio::test]
    async fn test_present_and_clean_up() {
        let server = test::with_directory_server();
        let provider = provider(&server, test::MDNS_KEY);

        provider.present("www.a.md", "tok", "tok.thumb").await.unwrap();
        assert_eq!(provider.records.lock().get("tok"), Some(&test::MDNS_RECORD_ID));

        provider.clean_up("www.a.md", "tok", "tok.thumb").await.unwrap();
        assert!(provider.records.lock().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_tokens() {
        let server = test::with_directory_server();
        let provider = provider(&server, test::MDNS_KEY);

        let (a, b) = tokio::join!(
            provider.present("a.md", "tok-a", "ka"),
            provider.present("b.md", "tok-b", "kb"),
        );
        a.unwrap();
        b.unwrap();

        assert_eq!(provider.records.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_clean_up_unknown_token() {
        let server = test::with_directory_server();
        let provider = provider(&server, test::MDNS_KEY);

        let err = provider.clean_up("a.md", "nope", "k").await.unwrap_err();
        assert!(err.to_string().contains("unknown ref"));
    }

    #[tokio::test]
    async fn test_api_error() {
        let server = test::with_directory_server();
        let provider = provider(&server, "wrong");

        let err = provider.present("a.md", "tok", "k").await.unwrap_err();
        assert!(format!("{err:#}").contains("[status code: 401] invalid credentials"));
        assert!(provider.records.lock().is_empty());
    }

    #[test]
    fn test_defaults() {
        let provider = MdnsProvider::new(Config::new("me@a.md", "secret")).unwrap();
        assert_eq!(
            provider.timeout(),
            (dns01::DEFAULT_PROPAGATION_TIMEOUT, dns01::DEFAULT_POLLING_INTERVAL)
        );
        assert_eq!(provider.capabilities(), Capabilities::default());
        assert_eq!(provider.zone("_acme-challenge.www.a.md."), "a.md");
        assert_eq!(provider.config.ttl, dns01::DEFAULT_TTL);
    }
}
