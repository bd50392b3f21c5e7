//! Page rendering.
//!
//! The server does not own the page templates; the client bundle does. A
//! renderer turns a template name plus its data into the document that boots
//! the client, with the data embedded as JSON.

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("Template path should end in .html or .xml: {0}")]
    UnsupportedTemplate(String),

    #[error("Template data could not be serialized: {0}")]
    Serialize(String),
}

pub trait TemplateRenderer: Send + Sync {
    fn render(&self, template_path: &str, data: &Map<String, Value>) -> Result<String, RenderError>;
}

/// Renders the single-page-app shell for every `.html` template and a data
/// envelope for `.xml` ones
#[derive(Debug, Clone, Default)]
pub struct SpaShellRenderer;

impl TemplateRenderer for SpaShellRenderer {
    fn render(&self, template_path: &str, data: &Map<String, Value>) -> Result<String, RenderError> {
        let json = serde_json::to_string(data).map_err(|e| RenderError::Serialize(e.to_string()))?;

        if template_path.ends_with(".html") {
            let title = data
                .get("app_title")
                .and_then(Value::as_str)
                .unwrap_or_default();
            Ok(format!(
                "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body data-template=\"{}\">\n<div id=\"app-root\"></div>\n<script type=\"application/json\" id=\"page-data\">{}</script>\n</body>\n</html>\n",
                escape_html(title),
                escape_html(template_path),
                json.replace("</", "<\\/"),
            ))
        } else if template_path.ends_with(".xml") {
            Ok(format!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<page template=\"{}\"><![CDATA[{}]]></page>\n",
                escape_html(template_path),
                json.replace("]]>", "]]]]><![CDATA[>"),
            ))
        } else {
            Err(RenderError::UnsupportedTemplate(template_path.to_string()))
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn html_shell_embeds_data_and_escapes_title() {
        let html = SpaShellRenderer
            .render("spa.html", &data(json!({"app_title": "A <b> title", "note": "</script>"})))
            .unwrap();
        assert!(html.contains("<title>A &lt;b&gt; title</title>"));
        assert!(html.contains("data-template=\"spa.html\""));
        assert!(!html.contains("</script>\"}"));
        assert!(html.contains("<\\/script>"));
    }

    #[test]
    fn xml_is_wrapped_in_cdata() {
        let xml = SpaShellRenderer.render("feed.xml", &data(json!({"a": 1}))).unwrap();
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<![CDATA[{\"a\":1}]]>"));
    }

    #[test]
    fn other_extensions_are_refused() {
        assert_eq!(
            SpaShellRenderer.render("page.txt", &Map::new()),
            Err(RenderError::UnsupportedTemplate("page.txt".into()))
        );
    }
}
