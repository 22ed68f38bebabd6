use eyre::{eyre, WrapErr as _};

use super::types::{ApiError, Record, Response};
use crate::{provider::dns01::un_fqdn, req::req_safe_read_body};

pub(crate) const HEADER_AUTH_EMAIL: &str = "Email";
pub(crate) const HEADER_AUTH_TOKEN: &str = "Authorization";

/// Minimal client for the record endpoints of the mDNS API.
#[derive(Debug, Clone)]
pub(crate) struct Client {
    http: reqwest::Client,
    base_url: String,
    email: String,
    token: String,
}

impl Client {
    pub(crate) fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        email: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Client {
            http,
            base_url: base_url.into(),
            email: email.into(),
            token: token.into(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.trim_end_matches('/'))
    }

    pub(crate) async fn add_record(&self, zone: &str, record: &Record) -> eyre::Result<Response> {
        let url = self.endpoint(&format!("domain/{}/record", un_fqdn(zone)));
        let req = self.http.post(url).json(record);

        let (status, body) = self.send(req).await.context("add record")?;

        serde_json::from_str(&body).wrap_err_with(|| {
            format!(
                "add record: unable to unmarshal response: [status code: {}] {body}",
                status.as_u16()
            )
        })
    }

    pub(crate) async fn remove_record(&self, zone: &str, id: i64) -> eyre::Result<()> {
        let url = self.endpoint(&format!("domain/{}/record/{id}", un_fqdn(zone)));
        let req = self.http.delete(url);

        self.send(req).await.context("remove record")?;
        Ok(())
    }

    /// Sends an authenticated request, returning the body of a successful response.
    async fn send(
        &self,
        req: reqwest::RequestBuilder,
    ) -> eyre::Result<(reqwest::StatusCode, String)> {
        let req = req
            .header(reqwest::header::ACCEPT, "application/json")
            .header(HEADER_AUTH_EMAIL, &self.email)
            .header(HEADER_AUTH_TOKEN, &self.token);

        log::trace!("{req:?}");

        let res = req.send().await?;
        let status = res.status();
        let body = req_safe_read_body(res).await;

        if !status.is_success() {
            return Err(parse_error(status, &body));
        }

        Ok((status, body))
    }
}

fn parse_error(status: reqwest::StatusCode, body: &str) -> eyre::Report {
    match serde_json::from_str::<ApiError>(body) {
        Ok(err) => eyre!("[status code: {}] {}", status.as_u16(), err.message),
        Err(_) => eyre!(
            "unexpected status code: [status code: {}] body: {body}",
            status.as_u16()
        ),
    }
}
