use anyhow::{Context, Result};
use axum::Router;
use axum::response::Html;
use axum::routing::get;
use std::sync::Arc;
use tera::{Context as TeraContext, Tera};

/// Serves the browser form. The page talks to the API server at `api_base`
/// and does presentation only; highlighting happens server-side.
pub async fn run_client(addr: String, api_base: String) -> Result<()> {
    let html = Arc::new(render_client_html(&api_base)?);
    let app = Router::new().route(
        "/",
        get({
            let html = html.clone();
            move || {
                let html = html.clone();
                async move { Html((*html).clone()) }
            }
        }),
    );
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| "failed to bind client address")?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn render_client_html(api_base: &str) -> Result<String> {
    let template = include_str!("templates/client.html.tera");
    let mut context = TeraContext::new();
    context.insert("api_base_json", &serde_json::to_string(api_base)?);
    Tera::one_off(template, &context, false).with_context(|| "failed to render client template")
}
