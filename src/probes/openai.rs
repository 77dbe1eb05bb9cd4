//! OpenAI-compatible vendor probe: builds a minimal streaming chat
//! completion request.

use super::effort;
use super::{ProbeRequest, VendorProbeError};
use crate::model::ProviderConfig;
use reqwest::header::HeaderMap;
use serde_json::{json, Value};

pub fn build_request(
    config: &ProviderConfig,
    endpoint: &str,
    headers: &HeaderMap,
) -> Result<ProbeRequest, VendorProbeError> {
    let base_url = derive_base_url(endpoint);
    let mut request_headers = headers.clone();
    request_headers.insert(
        reqwest::header::AUTHORIZATION,
        format!("Bearer {}", config.api_key)
            .parse()
            .map_err(|_| VendorProbeError::Other("invalid api key header".to_string()))?,
    );

    let (model, reasoning_effort) = effort::resolve_model_and_effort(&config.model);

    let mut body = json!({
        "model": model,
        "messages": [{"role": "user", "content": "hi"}],
        "max_tokens": 1,
        "temperature": 0,
        "stream": true,
    });
    if let Some(effort) = reasoning_effort {
        body["reasoning_effort"] = Value::String(effort);
    }
    merge_metadata(&mut body, config);

    Ok(ProbeRequest {
        base_url,
        url: endpoint.to_string(),
        api_key: config.api_key.clone(),
        header_overrides: config.request_headers.clone(),
        headers: request_headers,
        body,
    })
}

/// Trims `/chat/completions` and normalizes to `/v1` when the host is
/// `api.openai.com`; used only to key the vendor client cache.
fn derive_base_url(endpoint: &str) -> String {
    let trimmed = endpoint.trim_end_matches("/chat/completions");
    if trimmed.contains("api.openai.com") && !trimmed.ends_with("/v1") {
        format!("{}/v1", trimmed.trim_end_matches('/'))
    } else {
        trimmed.to_string()
    }
}

fn merge_metadata(body: &mut Value, config: &ProviderConfig) {
    if let (Some(obj), Some(metadata)) = (body.as_object_mut(), &config.metadata) {
        for (key, value) in metadata {
            obj.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProviderType;

    #[test]
    fn normalizes_openai_host_to_v1() {
        assert_eq!(
            derive_base_url("https://api.openai.com/v1/chat/completions"),
            "https://api.openai.com/v1"
        );
    }

    #[test]
    fn leaves_custom_gateway_untouched() {
        assert_eq!(
            derive_base_url("https://gateway.example.com/openai/chat/completions"),
            "https://gateway.example.com/openai"
        );
    }

    fn config() -> ProviderConfig {
        ProviderConfig {
            id: "A".into(),
            name: "A".into(),
            provider_type: ProviderType::Openai,
            endpoint: Some("https://api.openai.com/v1/chat/completions".into()),
            model: "gpt-5".into(),
            api_key: "sk-test".into(),
            is_maintenance: false,
            request_headers: None,
            metadata: None,
            group_name: None,
        }
    }

    #[test]
    fn request_body_carries_one_token_reasoning_effort_and_bearer_auth() {
        let headers = HeaderMap::new();
        let request = build_request(&config(), "https://api.openai.com/v1/chat/completions", &headers).unwrap();

        assert_eq!(request.body["max_tokens"], 1);
        assert_eq!(request.body["stream"], true);
        assert_eq!(request.body["reasoning_effort"], "medium");
        assert_eq!(
            request.headers.get(reqwest::header::AUTHORIZATION).unwrap(),
            "Bearer sk-test"
        );
    }
}
