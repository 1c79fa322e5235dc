//
// web.rs
// Atlas-Overlap
//
// Axum-based HTTP server exposing upload, volume summary, atlas overlap and download APIs.
//

use std::fmt::Display;
use std::net::SocketAddr;

use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::{
    catalog::{AtlasKind, CatalogSource},
    error::OverlapError,
    job,
    models::{RegionStat, VolumeSummary},
    storage::{self, FileStore},
    volume,
};

const INDEX_HTML: &str = r#"<!doctype html>
<html>
  <head><meta charset="utf-8"><title>Atlas Overlap</title></head>
  <body>
    <h1>Atlas Overlap</h1>
    <p>POST a NIfTI lesion mask, atlas or label table to <code>/api/upload</code>,
       then POST <code>{"lesion", "atlas", "kind", "catalog"}</code> to <code>/api/overlap</code>.</p>
  </body>
</html>
"#;

#[derive(Clone)]
struct AppState {
    store: FileStore,
}

type ApiResult<T> = Result<T, (StatusCode, String)>;

/// Bootstraps the Axum HTTP server and wires up API routes.
pub async fn start_server(host: &str, port: u16) -> anyhow::Result<()> {
    let state = AppState {
        store: FileStore::new("target/uploads")?,
    };

    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Server running at http://{}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/api/upload", post(upload_handler))
        .route("/api/volume/:filename", get(volume_handler))
        .route("/api/overlap", post(overlap_handler))
        .route("/api/download/:filename", get(download_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

async fn root_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let mut original_name = None;
    let mut data = None;

    // Find the first part named "file" and pull bytes eagerly.
    while let Some(field) = multipart.next_field().await.map_err(bad_request)? {
        if field.name() == Some("file") {
            original_name = field.file_name().map(|s| s.to_string());
            data = Some(field.bytes().await.map_err(internal_error)?);
            break;
        }
    }

    let data = data.ok_or((StatusCode::BAD_REQUEST, "No file uploaded".to_string()))?;
    let saved_name = state
        .store
        .save(original_name.as_deref(), &data)
        .map_err(bad_request)?;

    // Volumes are parsed once so a broken upload is reported immediately.
    let summary = if storage::is_volume(&saved_name) {
        let path = state.store.resolve(&saved_name).map_err(internal_error)?;
        let summary = tokio::task::spawn_blocking(move || volume::summarize(&path))
            .await
            .map_err(internal_error)?
            .map_err(bad_request)?;
        Some(summary)
    } else {
        None
    };

    Ok(Json(json!({
        "success": true,
        "filename": saved_name,
        "summary": summary
    })))
}

async fn volume_handler(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<Json<VolumeSummary>> {
    let path = state.store.resolve(&filename).map_err(not_found)?;
    let summary = tokio::task::spawn_blocking(move || volume::summarize(&path))
        .await
        .map_err(internal_error)?
        .map_err(internal_error)?;
    Ok(Json(summary))
}

#[derive(Debug, Deserialize)]
struct OverlapRequest {
    lesion: String,
    atlas: String,
    kind: String,
    catalog: Option<String>,
}

async fn overlap_handler(
    State(state): State<AppState>,
    Json(request): Json<OverlapRequest>,
) -> ApiResult<Json<Vec<RegionStat>>> {
    // Selector and catalog are checked before any volume is touched.
    let kind: AtlasKind = request.kind.parse().map_err(bad_request)?;
    let source = match (kind, request.catalog.as_deref()) {
        (AtlasKind::Brainstem, _) => CatalogSource::brainstem(),
        (_, Some(name)) => {
            let table = state.store.resolve(name).map_err(not_found)?;
            CatalogSource::for_kind(kind, Some(table.as_path()))
        }
        (_, None) => {
            return Err((
                StatusCode::BAD_REQUEST,
                format!("Atlas type '{}' needs an uploaded label table in 'catalog'", kind),
            ))
        }
    };
    let lesion_path = state.store.resolve(&request.lesion).map_err(not_found)?;
    let atlas_path = state.store.resolve(&request.atlas).map_err(not_found)?;

    let stats = tokio::task::spawn_blocking(move || {
        let catalog = source.load()?;
        let lesion = volume::load_lesion(&lesion_path)?;
        let atlas = volume::load_atlas(&atlas_path)?;
        job::compute_for(&lesion, &atlas, &catalog)
    })
    .await
    .map_err(internal_error)?
    .map_err(overlap_error)?;

    Ok(Json(stats))
}

async fn download_handler(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let path = state.store.resolve(&filename).map_err(not_found)?;
    let bytes = tokio::fs::read(&path).await.map_err(internal_error)?;
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        .map_err(internal_error)?;
    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

/// Caller mistakes (bad selector, table, grid or spacing) are 400s; the rest are 500s.
fn overlap_error(err: anyhow::Error) -> (StatusCode, String) {
    let status = match err.downcast_ref::<OverlapError>() {
        Some(e) if e.is_input_error() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, format!("{:#}", err))
}

fn bad_request<E: Display>(err: E) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, err.to_string())
}

fn internal_error<E: Display>(err: E) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

fn not_found<E: Display>(err: E) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, err.to_string())
}
