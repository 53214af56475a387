// CVM Fichas - Web Server
// Same two actions as the TUI: consultar (JSON) and gerar fichas (zip download)

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use cvm_fichas::{render, resolve_batch, BatchResult, Config, Registry, Template};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

/// Shared application state - read-only after startup, so no locks
#[derive(Clone)]
struct AppState {
    registry: Arc<Registry>,
    template: Arc<Template>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    fn err(data: T, error: String) -> Self {
        Self {
            success: false,
            data,
            error: Some(error),
        }
    }
}

#[derive(Deserialize)]
struct ConsultaRequest {
    /// One or more CNPJs separated by ',', ';' or newline
    cnpjs: String,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::ok(serde_json::json!({
        "status": "OK",
        "version": cvm_fichas::VERSION,
        "fundos": state.registry.fundo.len(),
    })))
}

/// POST /api/consulta - Resolve a batch of CNPJs
async fn consulta(
    State(state): State<AppState>,
    Json(req): Json<ConsultaRequest>,
) -> Json<ApiResponse<BatchResult>> {
    Json(ApiResponse::ok(resolve_batch(&state.registry, &req.cnpjs)))
}

/// POST /api/fichas - Resolve and return the zip of fichas
async fn fichas(State(state): State<AppState>, Json(req): Json<ConsultaRequest>) -> Response {
    let batch = resolve_batch(&state.registry, &req.cnpjs);

    if batch.records.is_empty() {
        return (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::err(batch, "Nenhum fundo encontrado".to_string())),
        )
            .into_response();
    }

    match render(&state.template, &batch.ficha_data()) {
        Ok(bytes) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/zip"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"fichas_fundos.zip\"",
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to render fichas");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::err(batch, e.to_string())),
            )
                .into_response()
        }
    }
}

/// GET / - Minimal page with the CNPJ text area and both buttons
async fn serve_index() -> impl IntoResponse {
    Html(INDEX_HTML)
}

const INDEX_HTML: &str = r#"<!doctype html>
<html lang="pt-br">
<head><meta charset="utf-8"><title>Consulta CVM por CNPJ</title></head>
<body>
<h1>Consulta de Fundo (CVM) por CNPJ</h1>
<p>Informe 1 ou mais CNPJs (separe por vírgula, ';' ou por linha)</p>
<textarea id="cnpjs" rows="6" cols="60" placeholder="00.000.000/0000-00, 11.111.111/1111-11"></textarea><br>
<button id="consultar">Consultar</button>
<button id="gerar">Gerar Fichas</button>
<pre id="out"></pre>
<script>
const body = () => JSON.stringify({ cnpjs: document.getElementById('cnpjs').value });
const headers = { 'Content-Type': 'application/json' };
document.getElementById('consultar').onclick = async () => {
  const r = await fetch('/api/consulta', { method: 'POST', headers, body: body() });
  document.getElementById('out').textContent = JSON.stringify(await r.json(), null, 2);
};
document.getElementById('gerar').onclick = async () => {
  const r = await fetch('/api/fichas', { method: 'POST', headers, body: body() });
  if (!r.ok) { document.getElementById('out').textContent = JSON.stringify(await r.json(), null, 2); return; }
  const a = document.createElement('a');
  a.href = URL.createObjectURL(await r.blob());
  a.download = 'fichas_fundos.zip';
  a.click();
};
</script>
</body>
</html>
"#;

// ============================================================================
// Main Server
// ============================================================================

fn main() -> Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    println!("🌐 CVM Fichas - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // Template and registry are loaded before the runtime starts:
    // the registry download uses the blocking client.
    let template = Template::load(&config.template_path)?;
    let registry = match &config.registry_file {
        Some(path) => Registry::from_file(path)?,
        None => Registry::fetch(&config.registry_url)?,
    };
    println!("✓ Registry loaded: {} fundos", registry.fundo.len());

    let state = AppState {
        registry: Arc::new(registry),
        template: Arc::new(template),
    };

    tokio::runtime::Runtime::new()
        .context("Failed to start tokio runtime")?
        .block_on(serve(state, &config.server_addr))
}

async fn serve(state: AppState, addr: &str) -> Result<()> {
    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/consulta", post(consulta))
        .route("/fichas", post(fichas))
        .with_state(state);

    // Build main router
    let app = Router::new()
        .route("/", get(serve_index))
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    println!("\n🚀 Server running on http://{}", addr);
    println!("   API: POST /api/consulta, POST /api/fichas");
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
