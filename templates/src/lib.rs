use leptos::{either::Either, prelude::*};

const COLLAPSE_THRESHOLD: usize = 300;

/// Render text inline when short, or as a `<details>` block showing a preview
/// when longer than the collapse threshold.
pub fn collapsible_block(content: &str, css_class: &str) -> AnyView {
    if content.chars().count() <= COLLAPSE_THRESHOLD {
        let text = content.to_string();
        let class = css_class.to_string();
        return if content.contains('\n') {
            view! { <pre class={class}>{text}</pre> }.into_any()
        } else {
            view! { <div class={class}>{text}</div> }.into_any()
        };
    }
    let preview: String = content.chars().take(COLLAPSE_THRESHOLD).collect();
    let preview = format!("{}...", preview);
    let preview_class = format!("preview-text {}", css_class);
    let full_class = format!("collapsible-full {}", css_class);
    let content = content.to_string();
    view! {
        <details class="collapsible">
            <summary>
                <span class={preview_class}>{preview}</span>
                " "
                <span class="show-more">"show more"</span>
                <span class="show-less">"show less"</span>
            </summary>
            <div class={full_class}>{content}</div>
        </details>
    }
    .into_any()
}

/// A small coloured label, e.g. for key or availability status.
pub fn badge(label: &str, tone: Tone) -> AnyView {
    let class = format!("badge {}", tone.class());
    let label = label.to_string();
    view! { <span class={class}>{label}</span> }.into_any()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Good,
    Bad,
    Muted,
}

impl Tone {
    fn class(&self) -> &'static str {
        match self {
            Tone::Good => "good",
            Tone::Bad => "bad",
            Tone::Muted => "muted",
        }
    }
}

pub fn page_layout(title: &str, body_html: String) -> String {
    let title = title
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;");
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
body {{ font-family: system-ui, sans-serif; padding: 16px 24px; max-width: 1200px; }}
nav.top {{ margin-bottom: 12px; }}
nav.top a {{ margin-right: 12px; }}
table {{ width: 100%; border-collapse: collapse; }}
th {{ text-align: left; padding: 6px 8px; border-bottom: 1px solid #ccc; }}
td {{ padding: 6px 8px; border-bottom: 1px solid #eee; vertical-align: top; }}
tr:last-child td {{ border-bottom: none; }}
pre {{ white-space: pre-wrap; }}
.badge {{ padding: 1px 6px; border-radius: 4px; font-size: 0.85em; }}
.badge.good {{ background: #dff3e0; color: #1f6b25; }}
.badge.bad {{ background: #fbe0e0; color: #8a1c1c; }}
.badge.muted {{ background: #eee; color: #666; }}
.message {{ margin: 8px 0; padding: 8px; border-left: 3px solid #ccc; }}
.message.user {{ border-color: #4a7bd0; }}
.message.assistant {{ border-color: #3a9a4a; }}
.message .role {{ font-weight: bold; font-size: 0.85em; color: #555; }}
details.collapsible {{ display: flex; flex-direction: column; }}
details.collapsible > summary {{ cursor: pointer; list-style: none; order: 1; }}
details.collapsible > summary::-webkit-details-marker {{ display: none; }}
details.collapsible > summary .show-less {{ display: none; }}
details.collapsible > .collapsible-full {{ white-space: pre-wrap; word-break: break-word; order: 0; }}
details.collapsible[open] > summary .preview-text {{ display: none; }}
details.collapsible[open] > summary .show-more {{ display: none; }}
details.collapsible[open] > summary .show-less {{ display: inline; }}
</style>
</head>
<body>
<nav class="top"><a href="/_dashboard">Overview</a><a href="/_dashboard/models">Models</a><a href="/_dashboard/chats">Chats</a><a href="/_dashboard/collaboration">Collaboration</a></nav>
{body_html}
</body>
</html>"#,
        title = title,
        body_html = body_html
    )
}

pub struct Breadcrumb {
    pub label: String,
    pub href: Option<String>,
}

impl Breadcrumb {
    pub fn link(label: impl ToString, href: impl ToString) -> Self {
        Self {
            label: label.to_string(),
            href: Some(href.to_string()),
        }
    }

    pub fn current(label: impl ToString) -> Self {
        Self {
            label: label.to_string(),
            href: None,
        }
    }
}

pub struct InfoRow {
    pub label: String,
    pub value: AnyView,
}

impl InfoRow {
    pub fn new(label: &str, value: impl ToString) -> Self {
        Self {
            label: label.to_string(),
            value: value.to_string().into_any(),
        }
    }

    pub fn view(label: &str, value: impl IntoView + 'static) -> Self {
        Self {
            label: label.to_string(),
            value: value.into_any(),
        }
    }
}

/// A link to a child page together with a count shown next to it.
pub struct Subpage {
    pub label: String,
    pub href: String,
    pub count: String,
}

impl Subpage {
    pub fn new(label: impl ToString, href: impl ToString, count: impl std::fmt::Display) -> Self {
        Self {
            label: label.to_string(),
            href: href.to_string(),
            count: count.to_string(),
        }
    }
}

pub struct Page<C: IntoView = ()> {
    pub title: String,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub info_rows: Vec<InfoRow>,
    pub content: C,
    pub subpages: Vec<Subpage>,
}

impl Default for Page {
    fn default() -> Self {
        Page {
            title: String::new(),
            breadcrumbs: Vec::new(),
            info_rows: Vec::new(),
            content: (),
            subpages: Vec::new(),
        }
    }
}

impl<C: IntoView> Page<C> {
    pub fn render(self) -> String {
        let Page {
            title,
            breadcrumbs,
            info_rows,
            content,
            subpages,
        } = self;

        let body = view! {
            {if !breadcrumbs.is_empty() {
                Either::Left(view! {
                    <h1>
                        {breadcrumbs.into_iter().enumerate().map(|(i, crumb)| {
                            let sep = if i > 0 { " / " } else { "" };
                            match crumb.href {
                                Some(href) => Either::Left(view! {
                                    {sep}<a href={href}>{crumb.label}</a>
                                }),
                                None => Either::Right(view! {
                                    {sep}{crumb.label}
                                }),
                            }
                        }).collect::<Vec<_>>()}
                    </h1>
                })
            } else {
                Either::Right(())
            }}

            {if !info_rows.is_empty() {
                Either::Left(view! {
                    <table class="info">
                        {info_rows.into_iter().map(|row| {
                            view! { <tr><th>{row.label}</th><td>{row.value}</td></tr> }
                        }).collect::<Vec<_>>()}
                    </table>
                })
            } else {
                Either::Right(())
            }}

            {if !subpages.is_empty() {
                Either::Left(view! {
                    <h2>"Sections"</h2>
                    <table>
                        <tr><th>"Page"</th><th>"Count"</th></tr>
                        {subpages.into_iter().map(|sp| {
                            view! { <tr><td><a href={sp.href}>{sp.label}</a></td><td>{sp.count}</td></tr> }
                        }).collect::<Vec<_>>()}
                    </table>
                })
            } else {
                Either::Right(())
            }}

            {content}
        };

        page_layout(&title, body.to_html())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_single_line_is_a_div() {
        let html = collapsible_block("short text", "cls").to_html();
        assert!(html.starts_with("<div"));
        assert!(html.contains(r#"class="cls""#));
        assert!(html.contains("short text"));
    }

    #[test]
    fn short_multiline_is_preformatted() {
        let html = collapsible_block("line1\nline2", "cls").to_html();
        assert!(html.starts_with("<pre"));
        assert!(html.contains("line1\nline2"));
    }

    #[test]
    fn long_content_collapses() {
        let html = collapsible_block(&"a".repeat(400), "cls").to_html();
        assert!(html.contains("<details"));
        assert!(html.contains("show more"));
        assert!(html.contains(&format!("{}...", "a".repeat(300))));
    }

    #[test]
    fn content_is_escaped() {
        let html = collapsible_block("<script>alert(1)</script>", "cls").to_html();
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>alert"));
    }

    #[test]
    fn badge_carries_tone() {
        let html = badge("active", Tone::Good).to_html();
        assert!(html.contains(r#"class="badge good""#));
        assert!(html.contains("active"));
    }

    #[test]
    fn layout_escapes_title_and_links_sections() {
        let html = page_layout("<Playground>", "<p>body</p>".to_string());
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>&lt;Playground&gt;</title>"));
        assert!(html.contains(r#"href="/_dashboard/models""#));
        assert!(html.contains("<p>body</p>"));
    }

    #[test]
    fn page_renders_every_section() {
        let html = Page {
            title: "Overview".to_string(),
            breadcrumbs: vec![Breadcrumb::link("Home", "/_dashboard"), Breadcrumb::current("Chats")],
            info_rows: vec![InfoRow::new("Models", 3)],
            content: view! { <p>"content"</p> },
            subpages: vec![Subpage::new("Chats", "/_dashboard/chats", 7)],
        }
        .render();
        assert!(html.contains("<h1>"));
        assert!(html.contains(" / "));
        assert!(html.contains("<th>Models</th>"));
        assert!(html.contains("<h2>Sections</h2>"));
        assert!(html.contains(r#"<a href="/_dashboard/chats">"#));
        assert!(html.contains("<p>content</p>"));
    }

    #[test]
    fn empty_sections_are_omitted() {
        let html = Page::default().render();
        assert!(!html.contains("<h1>"));
        assert!(!html.contains("Sections"));
        assert!(!html.contains(r#"class="info""#));
    }
}
