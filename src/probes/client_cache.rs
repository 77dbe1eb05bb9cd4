//! Vendor HTTP client cache, keyed by `(baseUrl, apiKey, stable(headers))`.
//! Reuses one `reqwest::Client` per distinct vendor/credential/header tuple
//! instead of building a fresh client (and connection pool) per probe.

use dashmap::DashMap;
use reqwest::Client;
use std::collections::BTreeMap;
use std::time::Duration;

pub struct VendorClientCache {
    clients: DashMap<String, Client>,
}

impl Default for VendorClientCache {
    fn default() -> Self {
        Self::new()
    }
}

impl VendorClientCache {
    pub fn new() -> Self {
        Self {
            clients: DashMap::new(),
        }
    }

    pub fn get_or_create(
        &self,
        base_url: &str,
        api_key: &str,
        headers: Option<&std::collections::HashMap<String, String>>,
        timeout: Duration,
    ) -> Client {
        let key = cache_key(base_url, api_key, headers);
        if let Some(client) = self.clients.get(&key) {
            return client.clone();
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client builds with default TLS backend");
        self.clients.insert(key, client.clone());
        client
    }
}

fn cache_key(
    base_url: &str,
    api_key: &str,
    headers: Option<&std::collections::HashMap<String, String>>,
) -> String {
    let stable_headers: BTreeMap<&String, &String> = headers
        .map(|h| h.iter().collect())
        .unwrap_or_default();
    format!("{base_url}|{api_key}|{stable_headers:?}")
}
