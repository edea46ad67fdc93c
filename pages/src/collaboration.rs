use common::models::CollaborationSession;
use leptos::{either::Either, prelude::*};
use templates::{Breadcrumb, Page};

pub fn render_collaboration(sessions: &[CollaborationSession]) -> String {
    let rows = sessions
        .iter()
        .map(|s| {
            let participants = s.participants().join(", ");
            let shared = s.shared_models();
            let shared = if shared.is_empty() {
                "-".to_string()
            } else {
                shared.join(", ")
            };
            let ws_path = format!("/collaboration/ws/{}", s.session_id);
            view! {
                <tr>
                    <td>{s.name.clone()}</td>
                    <td>{s.description.clone().unwrap_or_default()}</td>
                    <td>{participants}</td>
                    <td>{shared}</td>
                    <td><code>{ws_path}</code></td>
                    <td>{s.created_at.clone().unwrap_or_default()}</td>
                </tr>
            }
        })
        .collect::<Vec<_>>();

    let content = view! {
        <p>{format!("Active sessions: {}", rows.len())}</p>
        {if rows.is_empty() {
            Either::Left(view! { <p>"No active collaboration sessions."</p> })
        } else {
            Either::Right(view! {
                <table>
                    <tr>
                        <th>"Name"</th>
                        <th>"Description"</th>
                        <th>"Participants"</th>
                        <th>"Shared models"</th>
                        <th>"Socket"</th>
                        <th>"Created"</th>
                    </tr>
                    {rows}
                </table>
            })
        }}
    };

    Page {
        title: "LLM Playground - Collaboration".to_string(),
        breadcrumbs: vec![
            Breadcrumb::link("Overview", "/_dashboard"),
            Breadcrumb::current("Collaboration"),
        ],
        info_rows: vec![],
        content,
        subpages: vec![],
    }
    .render()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_participants_and_models() {
        let session = CollaborationSession {
            id: uuid::Uuid::new_v4(),
            name: "Pairing".into(),
            session_id: "abc".into(),
            created_by: "guest-user".into(),
            description: None,
            is_active: true,
            participants_json: r#"["guest-user","alice"]"#.into(),
            shared_models_json: "[]".into(),
            created_at: None,
            updated_at: None,
        };
        let html = render_collaboration(&[session]);
        assert!(html.contains("Active sessions: 1"));
        assert!(html.contains("<td>guest-user, alice</td>"));
        assert!(html.contains("<td>-</td>"));
        assert!(html.contains("/collaboration/ws/abc"));
    }

    #[test]
    fn empty_state() {
        let html = render_collaboration(&[]);
        assert!(html.contains("No active collaboration sessions."));
    }
}
