use common::catalog::Provider;
use leptos::prelude::*;
use templates::{badge, InfoRow, Page, Subpage, Tone};

/// Figures shown on the dashboard landing page.
pub struct Overview {
    pub model_count: i64,
    pub chat_count: i64,
    pub active_collab_count: i64,
    /// Providers that currently have an active API key.
    pub active_providers: Vec<String>,
}

pub fn render_home(overview: &Overview) -> String {
    let key_rows = Provider::ALL
        .iter()
        .map(|p| {
            let configured = overview.active_providers.iter().any(|a| a == p.as_str());
            let status = if configured {
                badge("configured", Tone::Good)
            } else {
                badge("no key", Tone::Muted)
            };
            view! { <tr><td>{p.label()}</td><td>{status}</td></tr> }
        })
        .collect::<Vec<_>>();

    let content = view! {
        <h2>"Provider keys"</h2>
        <table>
            <tr><th>"Provider"</th><th>"Status"</th></tr>
            {key_rows}
        </table>
    };

    Page {
        title: "LLM Playground - Overview".to_string(),
        breadcrumbs: vec![],
        info_rows: vec![InfoRow::new("Service", "LLM Playground API")],
        content,
        subpages: vec![
            Subpage::new("Models", "/_dashboard/models", overview.model_count),
            Subpage::new("Chats", "/_dashboard/chats", overview.chat_count),
            Subpage::new(
                "Collaboration",
                "/_dashboard/collaboration",
                overview.active_collab_count,
            ),
        ],
    }
    .render()
}
