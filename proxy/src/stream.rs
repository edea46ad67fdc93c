use common::catalog::Provider;
use futures::channel::mpsc;
use futures::StreamExt;

use crate::{anthropic, gemini, openai, sse::SseParser, GenerateParams, ProviderClient};

/// Receives text deltas in order. An `Err` item ends the stream early.
pub type DeltaReceiver = mpsc::UnboundedReceiver<Result<String, String>>;

/// What one upstream SSE event contributes to the reply.
#[derive(Debug, PartialEq, Eq)]
pub enum Delta {
    Text(String),
    Skip,
    Done,
}

fn delta_for(provider: Provider, data: &str) -> Delta {
    match provider {
        Provider::OpenAi => openai::delta(data),
        Provider::Anthropic => anthropic::delta(data),
        Provider::Gemini => gemini::delta(data),
    }
}

fn error_text(provider: Provider, body: &str) -> String {
    match provider {
        Provider::OpenAi => openai::error_text(body),
        Provider::Anthropic => anthropic::error_text(body),
        Provider::Gemini => gemini::error_text(body),
    }
}

pub(crate) async fn open(
    client: &ProviderClient,
    params: &GenerateParams,
) -> anyhow::Result<DeltaReceiver> {
    let provider = client.provider;
    let request = match provider {
        Provider::OpenAi => openai::request(client, params, true)?,
        Provider::Anthropic => anthropic::request(client, params, true)?,
        Provider::Gemini => gemini::request(client, params, true)?,
    };
    let upstream = request
        .header(reqwest::header::ACCEPT, "text/event-stream")
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("Error calling {}: {}", provider.label(), e.without_url()))?;

    let status = upstream.status();
    if !status.is_success() {
        let body = upstream.bytes().await?;
        anyhow::bail!(error_text(provider, &String::from_utf8_lossy(&body)));
    }

    let (tx, rx) = mpsc::unbounded();
    let mut byte_stream = upstream.bytes_stream();

    tokio::spawn(async move {
        let mut parser = SseParser::new();
        while let Some(chunk) = byte_stream.next().await {
            let chunk = match chunk {
                Ok(c) => c,
                Err(e) => {
                    let _ = tx.unbounded_send(Err(format!(
                        "Upstream stream error: {}",
                        e.without_url()
                    )));
                    return;
                }
            };
            for event in parser.feed(&chunk) {
                match delta_for(provider, &event.data) {
                    Delta::Text(text) => {
                        if tx.unbounded_send(Ok(text)).is_err() {
                            return; // client went away
                        }
                    }
                    Delta::Skip => {}
                    Delta::Done => return,
                }
            }
        }
        if let Some(event) = parser.flush() {
            if let Delta::Text(text) = delta_for(provider, &event.data) {
                let _ = tx.unbounded_send(Ok(text));
            }
        }
    });

    Ok(rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn params(model: &str) -> GenerateParams {
        GenerateParams {
            prompt: "count".into(),
            model: model.into(),
            temperature: 0.7,
            max_tokens: 50,
        }
    }

    async fn collect(mut rx: DeltaReceiver) -> Vec<Result<String, String>> {
        let mut out = Vec::new();
        while let Some(item) = rx.next().await {
            out.push(item);
        }
        out
    }

    fn sse(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .insert_header("content-type", "text/event-stream")
            .set_body_string(body.to_string())
    }

    #[tokio::test]
    async fn openai_stops_at_done() {
        let server = MockServer::start().await;
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"one\"}}]}\n\n\
                    data: {\"choices\":[{\"delta\":{\"content\":\" two\"}}]}\n\n\
                    data: [DONE]\n\n\
                    data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n\n";
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({"stream": true})))
            .respond_with(sse(body))
            .mount(&server)
            .await;

        let client = ProviderClient::new(
            Provider::OpenAi,
            "sk-x",
            &crate::test_config(&server.uri()),
            &reqwest::Client::new(),
        );
        let items = collect(client.stream(&params("gpt-4o")).await.unwrap()).await;
        assert_eq!(items, vec![Ok("one".to_string()), Ok(" two".to_string())]);
    }

    #[tokio::test]
    async fn anthropic_yields_block_deltas() {
        let server = MockServer::start().await;
        let body = "event: message_start\ndata: {\"type\":\"message_start\"}\n\n\
                    event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"delta\":{\"text\":\"Hel\"}}\n\n\
                    event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"delta\":{\"text\":\"lo\"}}\n\n\
                    event: message_stop\ndata: {\"type\":\"message_stop\"}\n\n";
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(sse(body))
            .mount(&server)
            .await;

        let client = ProviderClient::new(
            Provider::Anthropic,
            "k",
            &crate::test_config(&server.uri()),
            &reqwest::Client::new(),
        );
        let items = collect(client.stream(&params("claude-3-haiku-20240307")).await.unwrap()).await;
        let text: String = items.into_iter().map(|i| i.unwrap()).collect();
        assert_eq!(text, "Hello");
    }

    #[tokio::test]
    async fn gemini_uses_sse_alt() {
        let server = MockServer::start().await;
        let body = "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"a\"}]}}]}\r\n\r\n\
                    data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"b\"}]}}]}";
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.0-flash-exp:streamGenerateContent"))
            .and(query_param("alt", "sse"))
            .and(header("x-goog-api-key", "g"))
            .respond_with(sse(body))
            .mount(&server)
            .await;

        let client = ProviderClient::new(
            Provider::Gemini,
            "g",
            &crate::test_config(&server.uri()),
            &reqwest::Client::new(),
        );
        let items = collect(client.stream(&params("gemini-2.0-flash-exp")).await.unwrap()).await;
        assert_eq!(items, vec![Ok("a".to_string()), Ok("b".to_string())]);
    }

    /// Serve one SSE response written in two TCP writes, split at `cut`.
    async fn serve_in_two_writes(body: &'static [u8], cut: usize) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            let header_end = loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    return;
                }
                request.extend_from_slice(&buf[..n]);
                if let Some(i) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                    break i + 4;
                }
            };
            let content_length = String::from_utf8_lossy(&request[..header_end])
                .lines()
                .find_map(|l| {
                    let (name, value) = l.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            while request.len() < header_end + content_length {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let head = "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\nconnection: close\r\n\r\n";
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(&body[..cut]).await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            socket.write_all(&body[cut..]).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn utf8_split_between_reads_survives() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"café\"}}]}\n\ndata: [DONE]\n\n"
            .as_bytes();
        let cut = body.iter().position(|&b| b == 0xC3).unwrap() + 1;
        let base = serve_in_two_writes(body, cut).await;

        let client = ProviderClient::new(
            Provider::OpenAi,
            "sk-x",
            &crate::test_config(&base),
            &reqwest::Client::new(),
        );
        let items = collect(client.stream(&params("gpt-4o")).await.unwrap()).await;
        assert_eq!(items, vec![Ok("café".to_string())]);
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"message": "Rate limit reached"}
            })))
            .mount(&server)
            .await;

        let client = ProviderClient::new(
            Provider::OpenAi,
            "sk-x",
            &crate::test_config(&server.uri()),
            &reqwest::Client::new(),
        );
        let err = client.stream(&params("gpt-4o")).await.unwrap_err();
        assert_eq!(err.to_string(), "Error calling OpenAI: Rate limit reached");
    }
}
