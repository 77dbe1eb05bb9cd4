//! Google Gemini vendor probe: builds the `streamGenerateContent` SSE
//! request for the configured model, with the API key passed as a query
//! parameter per Gemini's wire convention.

use super::{ProbeRequest, VendorProbeError};
use crate::model::ProviderConfig;
use reqwest::header::HeaderMap;
use serde_json::json;

pub fn build_request(
    config: &ProviderConfig,
    endpoint: &str,
    headers: &HeaderMap,
) -> Result<ProbeRequest, VendorProbeError> {
    let base_url = endpoint.trim_end_matches('/').to_string();
    let request_url = stream_url(&base_url, &config.model, &config.api_key);

    let mut body = json!({
        "contents": [{"role": "user", "parts": [{"text": "hi"}]}],
        "generationConfig": {"maxOutputTokens": 1},
    });
    if let (Some(obj), Some(metadata)) = (body.as_object_mut(), &config.metadata) {
        for (key, value) in metadata {
            obj.insert(key.clone(), value.clone());
        }
    }

    Ok(ProbeRequest {
        base_url: base_url.clone(),
        url: request_url,
        api_key: config.api_key.clone(),
        header_overrides: config.request_headers.clone(),
        headers: headers.clone(),
        body,
    })
}

fn stream_url(base_url: &str, model: &str, api_key: &str) -> String {
    format!("{base_url}/models/{model}:streamGenerateContent?alt=sse&key={api_key}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProviderType;

    #[test]
    fn stream_url_uses_sse_and_carries_model_and_key() {
        assert_eq!(
            stream_url("https://generativelanguage.googleapis.com/v1beta", "gemini-1.5-flash", "key-123"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:streamGenerateContent?alt=sse&key=key-123"
        );
    }

    fn config() -> ProviderConfig {
        ProviderConfig {
            id: "A".into(),
            name: "A".into(),
            provider_type: ProviderType::Gemini,
            endpoint: Some("https://generativelanguage.googleapis.com/v1beta".into()),
            model: "gemini-1.5-flash".into(),
            api_key: "key-123".into(),
            is_maintenance: false,
            request_headers: None,
            metadata: None,
            group_name: None,
        }
    }

    #[test]
    fn request_body_sends_one_output_token_and_a_single_user_part() {
        let headers = HeaderMap::new();
        let request = build_request(
            &config(),
            "https://generativelanguage.googleapis.com/v1beta",
            &headers,
        )
        .unwrap();

        assert!(request.url.ends_with(":streamGenerateContent?alt=sse&key=key-123"));
        assert_eq!(request.body["generationConfig"]["maxOutputTokens"], 1);
        assert_eq!(request.body["contents"][0]["parts"][0]["text"], "hi");
    }
}
