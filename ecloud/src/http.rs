//! Shared HTTP plumbing for the repository client and the provisioner.
//!
//! Every call is reduced to a [`RawResponse`] (status, body, `Location`
//! header); callers decide which status counts as success.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_CHARSET, LOCATION};
use reqwest::{Client, NoProxy, Proxy, Url};

/// What the tools look at in a response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
    pub location: Option<String>,
}

impl RawResponse {
    pub async fn read(response: reqwest::Response) -> Result<Self, reqwest::Error> {
        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;
        Ok(RawResponse {
            status,
            body,
            location,
        })
    }
}

/// Build a client that asks for JSON and goes through `proxy` (`host:port`) when given.
///
/// Without a configured proxy, proxies from the environment are ignored too.
pub fn build_client(proxy: Option<&str>) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT_CHARSET, HeaderValue::from_static("UTF-8"));

    let builder = Client::builder().default_headers(headers);
    let builder = match proxy {
        Some(proxy) => {
            tracing::debug!(proxy, "Using HTTP proxy");
            builder.proxy(
                Proxy::all(format!("http://{proxy}"))?
                    .no_proxy(NoProxy::from_string("localhost,127.0.0.1")),
            )
        }
        None => builder.no_proxy(),
    };
    builder.build()
}

/// `url` with `http://` prepended when it names no scheme.
pub fn with_scheme(url: &str) -> String {
    if url.contains("://") {
        url.to_string()
    } else {
        format!("http://{url}")
    }
}

/// Append path segments to `base`. An empty final segment yields a trailing slash.
pub fn join_segments(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}
