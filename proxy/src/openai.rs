use serde_json::{json, Value};

use crate::{stream::Delta, vendor_error_message, GenerateOutcome, GenerateParams, ProviderClient};

pub(crate) fn endpoint(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

pub(crate) fn request_body(params: &GenerateParams, stream: bool) -> Value {
    let mut body = json!({
        "model": params.model,
        "messages": [{"role": "user", "content": params.prompt}],
        "temperature": params.temperature,
        "max_tokens": params.max_tokens,
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
    let url = endpoint(&client.config.openai_base_url);
    log::info!("openai {} -> {}", params.model, url);
    Ok(client
        .post_json(&url, &request_body(params, stream))?
        .bearer_auth(&client.api_key))
}

pub(crate) async fn generate(
    client: &ProviderClient,
    params: &GenerateParams,
) -> anyhow::Result<GenerateOutcome> {
    let resp = request(client, params, false)?.send().await?;
    let status = resp.status();
    let body = resp.bytes().await?;

    if !status.is_success() {
        let text = String::from_utf8_lossy(&body);
        return Ok(GenerateOutcome::failed(error_text(&text)));
    }

    let data: Value = serde_json::from_slice(&body)?;
    let reply = data["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("response has no choices[0].message.content"))?;
    let usage = data.get("usage").cloned().unwrap_or_else(|| json!({}));
    Ok(GenerateOutcome::ok(reply.to_string(), Some(usage)))
}

pub(crate) fn error_text(body: &str) -> String {
    format!("Error calling OpenAI: {}", vendor_error_message(body))
}

pub(crate) fn delta(data: &str) -> Delta {
    if data.trim() == "[DONE]" {
        return Delta::Done;
    }
    serde_json::from_str::<Value>(data)
        .ok()
        .and_then(|v| v["choices"][0]["delta"]["content"].as_str().map(String::from))
        .filter(|s| !s.is_empty())
        .map_or(Delta::Skip, Delta::Text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::catalog::Provider;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn params() -> GenerateParams {
        GenerateParams {
            prompt: "Say hi".into(),
            model: "gpt-4o-mini".into(),
            temperature: 0.7,
            max_tokens: 1000,
        }
    }

    async fn client_for(server: &MockServer) -> ProviderClient {
        ProviderClient::new(
            Provider::OpenAi,
            "sk-test",
            &crate::test_config(&server.uri()),
            &reqwest::Client::new(),
        )
    }

    #[tokio::test]
    async fn generate_reads_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({"model": "gpt-4o-mini", "max_tokens": 1000})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "hi!"}}],
                "usage": {"total_tokens": 7},
            })))
            .mount(&server)
            .await;

        let out = client_for(&server).await.generate(&params()).await;
        assert!(out.success);
        assert_eq!(out.response.as_deref(), Some("hi!"));
        assert_eq!(out.usage.unwrap()["total_tokens"], 7);
    }

    #[tokio::test]
    async fn vendor_error_message_is_prefixed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"message": "Incorrect API key provided"}
            })))
            .mount(&server)
            .await;

        let out = client_for(&server).await.generate(&params()).await;
        assert!(!out.success);
        assert_eq!(
            out.error.as_deref(),
            Some("Error calling OpenAI: Incorrect API key provided")
        );
    }

    #[tokio::test]
    async fn health_check_uses_small_budget() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"max_tokens": 10, "temperature": 0.1})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "Hello"}}]
            })))
            .mount(&server)
            .await;

        let report = client_for(&server).await.health_check("gpt-4o").await;
        assert!(report.available);
        assert!(report.error.is_none());
    }

    #[tokio::test]
    async fn unreachable_host_is_a_failed_outcome() {
        let client = ProviderClient::new(
            Provider::OpenAi,
            "sk-test",
            &crate::test_config("http://127.0.0.1:9"),
            &reqwest::Client::new(),
        );
        let out = client.generate(&params()).await;
        assert!(!out.success);
        assert!(out.error.unwrap().starts_with("Error calling OpenAI: "));
    }

    #[test]
    fn stream_deltas() {
        assert_eq!(delta("[DONE]"), Delta::Done);
        assert_eq!(
            delta(r#"{"choices":[{"delta":{"content":"he"}}]}"#),
            Delta::Text("he".into())
        );
        assert_eq!(delta(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#), Delta::Skip);
    }
}
