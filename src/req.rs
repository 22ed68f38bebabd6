use std::time::Duration;

use crate::api::Problem;

pub(crate) type ReqResult<T> = std::result::Result<T, Problem>;

const PROBLEM_JSON: &str = "application/problem+json";

pub(crate) fn http_client(timeout: Duration) -> eyre::Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .connect_timeout(timeout)
        .timeout(timeout)
        .build()?)
}

pub(crate) async fn req_get(client: &reqwest::Client, url: &str) -> eyre::Result<reqwest::Response> {
    let req = client.get(url);
    log::trace!("{req:?}");
    Ok(req.send().await?)
}

pub(crate) async fn req_handle_error(res: reqwest::Response) -> ReqResult<reqwest::Response> {
    // ok responses pass through
    if res.status().is_success() {
        return Ok(res);
    }

    let status = res.status();
    let is_problem = res
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|val| val.to_str().ok())
        .is_some_and(|val| val.starts_with(PROBLEM_JSON));

    let body = req_safe_read_body(res).await;

    let problem = if is_problem {
        // if we were sent a problem+json, deserialize it
        serde_json::from_str(&body).unwrap_or_else(|err| Problem {
            _type: "problemJsonFail".to_owned(),
            detail: Some(format!(
                "Failed to deserialize application/problem+json ({err}) body: {body}"
            )),
            subproblems: None,
        })
    } else {
        Problem::http(status, &body)
    };

    Err(problem)
}

pub(crate) async fn req_safe_read_body(res: reqwest::Response) -> String {
    // servers sometimes close the connection abruptly after sending the body
    res.text().await.unwrap_or_default()
}
