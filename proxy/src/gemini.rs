use serde_json::{json, Value};

use crate::{stream::Delta, vendor_error_message, GenerateOutcome, GenerateParams, ProviderClient};

/// Endpoint URL. The key travels in the `x-goog-api-key` header, never here.
pub(crate) fn endpoint(base_url: &str, model: &str, stream: bool) -> String {
    let method = if stream {
        "streamGenerateContent"
    } else {
        "generateContent"
    };
    format!("{}/models/{}:{}", base_url.trim_end_matches('/'), model, method)
}

pub(crate) fn request_body(params: &GenerateParams) -> Value {
    json!({
        "contents": [{"parts": [{"text": params.prompt}]}],
        "generationConfig": {
            "temperature": params.temperature,
            "maxOutputTokens": params.max_tokens,
        },
    })
}

pub(crate) fn request(
    client: &ProviderClient,
    params: &GenerateParams,
    stream: bool,
) -> anyhow::Result<reqwest::RequestBuilder> {
    let mut url = endpoint(&client.config.gemini_base_url, &params.model, stream);
    if stream {
        url.push_str("?alt=sse");
    }
    log::info!("gemini {} -> {}", params.model, url);
    Ok(client
        .post_json(&url, &request_body(params))?
        .header("x-goog-api-key", &client.api_key))
}

pub(crate) async fn generate(
    client: &ProviderClient,
    params: &GenerateParams,
) -> anyhow::Result<GenerateOutcome> {
    let resp = request(client, params, false)?
        .send()
        .await
        .map_err(reqwest::Error::without_url)?;
    let status = resp.status();
    let body = resp.bytes().await?;

    if !status.is_success() {
        return Ok(GenerateOutcome::failed(error_text(&String::from_utf8_lossy(&body))));
    }

    let data: Value = serde_json::from_slice(&body)?;
    let reply = candidate_text(&data)
        .ok_or_else(|| anyhow::anyhow!("response has no candidates[0].content.parts[0].text"))?;
    Ok(GenerateOutcome::ok(reply, data.get("usageMetadata").cloned()))
}

pub(crate) fn error_text(body: &str) -> String {
    vendor_error_message(body)
}

fn candidate_text(v: &Value) -> Option<String> {
    v["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .map(String::from)
}

pub(crate) fn delta(data: &str) -> Delta {
    serde_json::from_str::<Value>(data)
        .ok()
        .and_then(|v| candidate_text(&v))
        .filter(|t| !t.is_empty())
        .map_or(Delta::Skip, Delta::Text)
}
