//! Endpoint ping: a cheap HEAD/GET round-trip to a provider's origin,
//! independent of the vendor wire probe, used only to report raw network
//! latency alongside the API response time.

use isahc::config::{Configurable, RedirectPolicy};
use isahc::{AsyncReadResponseExt, HttpClient, Request};
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

const PING_TIMEOUT: Duration = Duration::from_secs(8);
const USER_AGENT: &str = "check-cx/0.1.0";

/// Derives `scheme://host[:port]` from `endpoint`, attempts a `HEAD`
/// request first, falling back to `GET` on any error or timeout. Returns
/// the first successful round-trip in ms, or `None` if both fail or the
/// URL does not parse. Never panics or propagates an error.
pub async fn measure_endpoint_ping(endpoint: &str) -> Option<u64> {
    let origin = derive_origin(endpoint)?;
    let client = ping_client()?;

    if let Some(ms) = try_request(&client, &origin, "HEAD").await {
        return Some(ms);
    }
    try_request(&client, &origin, "GET").await
}

fn derive_origin(endpoint: &str) -> Option<String> {
    let url = Url::parse(endpoint).ok()?;
    let host = url.host_str()?;
    let mut origin = format!("{}://{}", url.scheme(), host);
    if let Some(port) = url.port() {
        origin.push_str(&format!(":{}", port));
    }
    Some(origin)
}

fn ping_client() -> Option<HttpClient> {
    HttpClient::builder()
        .redirect_policy(RedirectPolicy::None)
        .timeout(PING_TIMEOUT)
        .default_header("User-Agent", USER_AGENT)
        .build()
        .ok()
}

async fn try_request(client: &HttpClient, origin: &str, method: &str) -> Option<u64> {
    let request = Request::builder()
        .method(method)
        .uri(origin)
        .header("Cache-Control", "no-cache")
        .body(Vec::new())
        .ok()?;

    let started = Instant::now();
    match client.send_async(request).await {
        Ok(mut response) => {
            // discard body
            let _ = response.bytes().await;
            Some(started.elapsed().as_millis() as u64)
        }
        Err(err) => {
            debug!(error = %err, method, origin, "endpoint ping attempt failed");
            None
        }
    }
}
