use common::models::ChatHistory;
use common::truncate::{truncate_strings, truncate_text};
use leptos::{either::Either, prelude::*};
use serde_json::Value;
use templates::{collapsible_block, Breadcrumb, InfoRow, Page};

const PREVIEW_CHARS: usize = 80;
const BLOCK_CHARS: usize = 2000;

/// Plain text of a message's content: strings as-is, text blocks joined, and
/// anything else as (truncated) JSON.
fn content_text(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Array(blocks) => blocks
            .iter()
            .map(|b| match b.get("text").and_then(|t| t.as_str()) {
                Some(text) => text.to_string(),
                None => truncate_strings(b, BLOCK_CHARS).to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        other => truncate_strings(other, BLOCK_CHARS).to_string(),
    }
}

fn last_message_preview(chat: &ChatHistory) -> String {
    chat.messages()
        .last()
        .map(|m| content_text(&m["content"]).replace('\n', " "))
        .map(|text| truncate_text(&text, PREVIEW_CHARS))
        .unwrap_or_default()
}

pub fn render_chats(chats: &[ChatHistory]) -> String {
    let total = chats.len();
    let rows = chats
        .iter()
        .map(|c| {
            let href = format!("/_dashboard/chats/{}", c.session_id);
            let title = c.title.clone().unwrap_or_else(|| c.session_id.clone());
            let count = c.messages().len();
            let preview = last_message_preview(c);
            let model = c.model_name.clone();
            let updated = c.updated_at.clone().unwrap_or_default();
            view! {
                <tr>
                    <td><a href={href}>{title}</a></td>
                    <td>{model}</td>
                    <td>{count}</td>
                    <td>{preview}</td>
                    <td>{updated}</td>
                </tr>
            }
        })
        .collect::<Vec<_>>();

    let content = view! {
        <p>{format!("Total: {}", total)}</p>
        {if rows.is_empty() {
            Either::Left(view! { <p>"No chats yet."</p> })
        } else {
            Either::Right(view! {
                <table>
                    <tr>
                        <th>"Title"</th>
                        <th>"Model"</th>
                        <th>"Messages"</th>
                        <th>"Last message"</th>
                        <th>"Updated"</th>
                    </tr>
                    {rows}
                </table>
            })
        }}
    };

    Page {
        title: "LLM Playground - Chats".to_string(),
        breadcrumbs: vec![
            Breadcrumb::link("Overview", "/_dashboard"),
            Breadcrumb::current("Chats"),
        ],
        info_rows: vec![],
        content,
        subpages: vec![],
    }
    .render()
}

pub fn render_chat(chat: &ChatHistory) -> String {
    let messages = chat
        .messages()
        .into_iter()
        .map(|m| {
            let role = m
                .get("role")
                .and_then(|r| r.as_str())
                .unwrap_or("unknown")
                .to_string();
            let class = format!("message {}", role);
            let body = collapsible_block(&content_text(&m["content"]), "content");
            view! {
                <div class={class}>
                    <div class="role">{role}</div>
                    {body}
                </div>
            }
        })
        .collect::<Vec<_>>();

    let title = chat.title.clone().unwrap_or_else(|| chat.session_id.clone());
    let content = view! {
        <h2>"Transcript"</h2>
        {if messages.is_empty() {
            Either::Left(view! { <p>"No messages."</p> })
        } else {
            Either::Right(messages)
        }}
    };

    Page {
        title: format!("LLM Playground - {}", title),
        breadcrumbs: vec![
            Breadcrumb::link("Overview", "/_dashboard"),
            Breadcrumb::link("Chats", "/_dashboard/chats"),
            Breadcrumb::current(title),
        ],
        info_rows: vec![
            InfoRow::new("Session", &chat.session_id),
            InfoRow::new("Model", &chat.model_name),
            InfoRow::new("Model ID", chat.model_id.as_deref().unwrap_or("-")),
            InfoRow::new("Created", chat.created_at.as_deref().unwrap_or("")),
            InfoRow::new("Updated", chat.updated_at.as_deref().unwrap_or("")),
        ],
        content,
        subpages: vec![],
    }
    .render()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chat(messages: Value) -> ChatHistory {
        ChatHistory {
            id: uuid::Uuid::new_v4(),
            user_id: "guest-user".into(),
            session_id: "sess-1".into(),
            model_id: Some("openai-gpt-4o".into()),
            model_name: "GPT-4o".into(),
            messages_json: messages.to_string(),
            title: Some("Rust questions".into()),
            created_at: Some("2025-01-01 10:00:00.000".into()),
            updated_at: Some("2025-01-01 10:05:00.000".into()),
        }
    }

    #[test]
    fn content_text_handles_block_arrays() {
        let blocks = json!([{"type": "text", "text": "one"}, {"type": "image", "url": "x"}]);
        let text = content_text(&blocks);
        assert!(text.starts_with("one\n"));
        assert!(text.contains("\"image\""));
        assert_eq!(content_text(&Value::Null), "");
    }

    #[test]
    fn list_shows_preview_of_last_message() {
        let c = chat(json!([
            {"role": "user", "content": "hi"},
            {"role": "assistant", "content": "x".repeat(200)}
        ]));
        let html = render_chats(&[c]);
        assert!(html.contains(r#"<a href="/_dashboard/chats/sess-1">Rust questions</a>"#));
        assert!(html.contains("<td>2</td>"));
        assert!(html.contains(&format!("{}...", "x".repeat(80))));
    }

    #[test]
    fn empty_list_message() {
        assert!(render_chats(&[]).contains("No chats yet."));
    }

    #[test]
    fn transcript_collapses_long_messages() {
        let c = chat(json!([
            {"role": "user", "content": "short <question>"},
            {"role": "assistant", "content": "y".repeat(1000)}
        ]));
        let html = render_chat(&c);
        assert!(html.contains(r#"class="message user""#));
        assert!(html.contains(r#"class="message assistant""#));
        assert!(html.contains("short &lt;question&gt;"));
        assert!(html.contains("show more"));
        assert!(html.contains("<th>Model ID</th><td>openai-gpt-4o</td>"));
    }
}
