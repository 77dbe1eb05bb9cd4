//! Anthropic Messages API vendor probe: builds a minimal streaming
//! `messages` request and the `x-api-key` / `anthropic-version` headers it
//! requires.

use super::{ProbeRequest, VendorProbeError};
use crate::model::ProviderConfig;
use reqwest::header::HeaderMap;
use serde_json::json;

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub fn build_request(
    config: &ProviderConfig,
    endpoint: &str,
    headers: &HeaderMap,
) -> Result<ProbeRequest, VendorProbeError> {
    let base_url = derive_base_url(endpoint);
    let mut request_headers = headers.clone();
    request_headers.insert(
        "x-api-key",
        config
            .api_key
            .parse()
            .map_err(|_| VendorProbeError::Other("invalid api key header".to_string()))?,
    );
    request_headers.insert("anthropic-version", ANTHROPIC_VERSION.parse().unwrap());

    let mut body = json!({
        "model": config.model,
        "max_tokens": 1,
        "messages": [{"role": "user", "content": "hi"}],
        "stream": true,
    });
    if let (Some(obj), Some(metadata)) = (body.as_object_mut(), &config.metadata) {
        for (key, value) in metadata {
            obj.insert(key.clone(), value.clone());
        }
    }

    Ok(ProbeRequest {
        base_url,
        url: endpoint.to_string(),
        api_key: config.api_key.clone(),
        header_overrides: config.request_headers.clone(),
        headers: request_headers,
        body,
    })
}

/// Base URL is the endpoint with a trailing `/v1/messages` stripped; used
/// only to key the vendor client cache.
fn derive_base_url(endpoint: &str) -> String {
    endpoint.trim_end_matches("/v1/messages").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProviderType;

    #[test]
    fn strips_messages_suffix() {
        assert_eq!(
            derive_base_url("https://api.anthropic.com/v1/messages"),
            "https://api.anthropic.com"
        );
    }

    fn config() -> ProviderConfig {
        ProviderConfig {
            id: "A".into(),
            name: "A".into(),
            provider_type: ProviderType::Anthropic,
            endpoint: Some("https://api.anthropic.com/v1/messages".into()),
            model: "claude-3-5-haiku-latest".into(),
            api_key: "sk-ant-test".into(),
            is_maintenance: false,
            request_headers: None,
            metadata: None,
            group_name: None,
        }
    }

    #[test]
    fn request_carries_version_and_api_key_headers() {
        let headers = HeaderMap::new();
        let request = build_request(&config(), "https://api.anthropic.com/v1/messages", &headers).unwrap();

        assert_eq!(request.headers.get("x-api-key").unwrap(), "sk-ant-test");
        assert_eq!(
            request.headers.get("anthropic-version").unwrap(),
            ANTHROPIC_VERSION
        );
        assert_eq!(request.body["max_tokens"], 1);
        assert_eq!(request.body["stream"], true);
    }
}
