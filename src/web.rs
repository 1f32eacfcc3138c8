use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use lazy_static::lazy_static;
use minijinja::{context, Environment};
use rust_embed::RustEmbed;

use crate::error::RelayResult;
use crate::ocr::recognizer::RecognitionResult;

#[derive(RustEmbed)]
#[folder = "static/"]
pub struct Assets;

lazy_static! {
    static ref TEMPLATES: Environment<'static> = {
        let mut env = Environment::new();
        env.add_template("index.html", include_str!("../templates/index.html"))
            .expect("Failed to load index template");
        env
    };
}

pub fn render_index() -> RelayResult<Html<String>> {
    render(context! {})
}

pub fn render_result(result: &RecognitionResult) -> RelayResult<Html<String>> {
    render(context! { result })
}

pub fn render_error(message: &str) -> RelayResult<Html<String>> {
    render(context! { error => message })
}

fn render(ctx: minijinja::Value) -> RelayResult<Html<String>> {
    let page = TEMPLATES.get_template("index.html")?.render(ctx)?;
    Ok(Html(page))
}

pub async fn serve_asset(Path(file): Path<String>) -> Response {
    match Assets::get(&file) {
        Some(content) => {
            let mime = mime_guess::from_path(&file).first_or_octet_stream();
            (
                [(header::CONTENT_TYPE, mime.as_ref())],
                content.data.into_owned(),
            )
                .into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn the_index_carries_the_upload_form() {
        let page = render_index().unwrap().0;
        assert!(page.contains(r#"enctype="multipart/form-data""#));
        assert!(page.contains(r#"name="file""#));
        assert!(!page.contains("class=\"error\""));
    }

    #[test]
    fn recognized_text_is_html_escaped() {
        let result = RecognitionResult {
            text: "<script>alert(1)</script>".to_string(),
            fields: BTreeMap::new(),
        };
        let page = render_result(&result).unwrap().0;
        assert!(page.contains("&lt;script&gt;"));
        assert!(!page.contains("<script>alert"));
    }

    #[test]
    fn empty_text_renders_as_no_text_detected() {
        let result = RecognitionResult {
            text: String::new(),
            fields: BTreeMap::new(),
        };
        let page = render_result(&result).unwrap().0;
        assert!(page.contains("No text detected."));
    }

    #[test]
    fn extracted_fields_show_up_in_the_table() {
        let mut fields = BTreeMap::new();
        fields.insert("invoice".to_string(), Some("INV-1042".to_string()));
        fields.insert("iban".to_string(), None);
        let result = RecognitionResult {
            text: "Invoice INV-1042".to_string(),
            fields,
        };
        let page = render_result(&result).unwrap().0;
        assert!(page.contains("invoice"));
        assert!(page.contains("INV-1042"));
        assert!(page.contains("no match"));
    }

    #[test]
    fn errors_render_in_the_error_section() {
        let page = render_error("Unsupported content type text/plain")
            .unwrap()
            .0;
        assert!(page.contains("class=\"error\""));
        // minijinja escapes the slash in the message.
        assert!(page.contains("Unsupported content type text&#x2f;plain"));
    }

    #[tokio::test]
    async fn the_stylesheet_is_served_with_its_mime_type() {
        let response = serve_asset(Path("style.css".to_string())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/css"
        );
    }

    #[tokio::test]
    async fn a_missing_asset_is_a_404() {
        let response = serve_asset(Path("nope.js".to_string())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
