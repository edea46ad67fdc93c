use serde_json::{json, Value};

use crate::{stream::Delta, GenerateOutcome, GenerateParams, ProviderClient};

pub(crate) fn endpoint(base_url: &str) -> String {
    format!("{}/messages", base_url.trim_end_matches('/'))
}

pub(crate) fn request_body(params: &GenerateParams, stream: bool) -> Value {
    let mut body = json!({
        "model": params.model,
        "messages": [{"role": "user", "content": params.prompt}],
        "max_tokens": params.max_tokens,
        "temperature": params.temperature,
    });
    if stream {
        body["stream"] = Value::Bool(true);
    }
    body
}

pub(crate) fn request(
    client: &ProviderClient,
    params: &GenerateParams,
    stream: bool,
) -> anyhow::Result<reqwest::RequestBuilder> {
    let url = endpoint(&client.config.anthropic_base_url);
    log::info!("anthropic {} -> {}", params.model, url);
    Ok(client
        .post_json(&url, &request_body(params, stream))?
        .header("x-api-key", &client.api_key)
        .header("anthropic-version", &client.config.anthropic_version))
}

pub(crate) async fn generate(
    client: &ProviderClient,
    params: &GenerateParams,
) -> anyhow::Result<GenerateOutcome> {
    let resp = request(client, params, false)?.send().await?;
    let status = resp.status();
    let body = resp.bytes().await?;

    if !status.is_success() {
        return Ok(GenerateOutcome::failed(error_text(&String::from_utf8_lossy(&body))));
    }

    let data: Value = serde_json::from_slice(&body)?;
    let reply = data["content"][0]["text"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("response has no content[0].text"))?;
    let usage = data.get("usage").cloned().unwrap_or_else(|| json!({}));
    Ok(GenerateOutcome::ok(reply.to_string(), Some(usage)))
}

/// Anthropic errors are passed through verbatim.
pub(crate) fn error_text(body: &str) -> String {
    body.to_string()
}

pub(crate) fn delta(data: &str) -> Delta {
    let Ok(v) = serde_json::from_str::<Value>(data) else {
        return Delta::Skip;
    };
    match v["type"].as_str() {
        Some("content_block_delta") => v["delta"]["text"]
            .as_str()
            .map_or(Delta::Skip, |t| Delta::Text(t.to_string())),
        Some("message_stop") => Delta::Done,
        _ => Delta::Skip,
    }
}
