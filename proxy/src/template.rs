use handlebars::Handlebars;
use serde_json::Value;

/// Render a Handlebars template with the given data, falling back to the raw
/// template string on error.
pub fn render_template(template: &str, data: &Value) -> String {
    let mut hbs = Handlebars::new();
    hbs.set_strict_mode(false);
    hbs.register_escape_fn(handlebars::no_escape);
    match hbs.render_template(template, data) {
        Ok(s) => s,
        Err(e) => {
            log::warn!("Handlebars template render error: {}", e);
            template.to_string()
        }
    }
}
