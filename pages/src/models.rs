use common::models::ModelEntry;
use leptos::{either::Either, prelude::*};
use templates::{badge, Breadcrumb, Page, Tone};

fn availability(model: &ModelEntry) -> AnyView {
    match model.available {
        Some(true) => badge("available", Tone::Good),
        Some(false) => badge("unavailable", Tone::Bad),
        None => badge("unchecked", Tone::Muted),
    }
}

pub fn render_models(models: &[ModelEntry]) -> String {
    let models = models.to_vec();
    let total = models.len();

    let content = view! {
        <p>{format!("Total: {}", total)}</p>
        {if models.is_empty() {
            Either::Left(view! { <p>"No models registered. Add a provider API key to register its catalog."</p> })
        } else {
            Either::Right(view! {
                <table>
                    <tr>
                        <th>"Name"</th>
                        <th>"Type"</th>
                        <th>"Provider"</th>
                        <th>"Identifier"</th>
                        <th>"Status"</th>
                        <th>"Availability"</th>
                        <th>"Requests"</th>
                        <th>"Avg time (s)"</th>
                        <th>"Success %"</th>
                        <th>"Checked"</th>
                    </tr>
                    {models.into_iter().map(|m| {
                        let avail = availability(&m);
                        let avg = format!("{:.2}", m.avg_response_time);
                        let rate = format!("{:.1}", m.success_rate);
                        view! {
                            <tr>
                                <td>{m.name}</td>
                                <td>{m.model_type}</td>
                                <td>{m.provider.unwrap_or_default()}</td>
                                <td>{m.model_identifier.unwrap_or_default()}</td>
                                <td>{m.status}</td>
                                <td>{avail}</td>
                                <td>{m.total_requests}</td>
                                <td>{avg}</td>
                                <td>{rate}</td>
                                <td>{m.last_checked_at.unwrap_or_default()}</td>
                            </tr>
                        }
                    }).collect::<Vec<_>>()}
                </table>
            })
        }}
    };

    Page {
        title: "LLM Playground - Models".to_string(),
        breadcrumbs: vec![
            Breadcrumb::link("Overview", "/_dashboard"),
            Breadcrumb::current("Models"),
        ],
        info_rows: vec![],
        content,
        subpages: vec![],
    }
    .render()
}
