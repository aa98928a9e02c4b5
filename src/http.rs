//! HTTP interface.
//!
//! Every handler hands its engine call to tokio's blocking pool: rebuilds
//! take seconds and even a search embeds the query on the CPU.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json,
    Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::{
    catalog::Document,
    engine::{SearchEngine, UploadOutcome},
    error::{Error, Result},
    search::{SearchOutcome, SearchRequest},
};

/// Largest accepted upload body.
pub const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

#[derive(Clone)]
struct AppState {
    engine: Arc<SearchEngine>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// An engine error on its way to becoming an HTTP response.
#[derive(Debug)]
struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::UnsupportedInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, %status, "request rejected");
        }
        (
            status,
            Json(ErrorBody {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Build the application router around `engine`.
pub fn router(engine: Arc<SearchEngine>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/search", post(search))
        .route("/documents", get(list_documents))
        .route("/documents/{doc_id}/tags", post(update_tags))
        .route("/thumbnail/{doc_id}", get(thumbnail))
        .route("/upload", post(upload))
        .route("/files/{*path}", get(fetch_file))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(AppState { engine })
}

/// Serve until Ctrl-C.
pub async fn serve(engine: Arc<SearchEngine>, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, router(engine))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

/// Run `f` against the engine on the blocking pool.
async fn blocking<T, F>(state: &AppState, f: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&SearchEngine) -> Result<T> + Send + 'static,
{
    let engine = Arc::clone(&state.engine);
    tokio::task::spawn_blocking(move || f(&engine))
        .await
        .map_err(|e| {
            ApiError(Error::Io(std::io::Error::other(format!(
                "engine task failed: {e}"
            ))))
        })?
        .map_err(ApiError)
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    epoch: u64,
    documents: usize,
}

async fn healthz(State(state): State<AppState>) -> Json<Health> {
    let generation = state.engine.snapshot();
    Json(Health {
        status: "ok",
        epoch: generation.epoch(),
        documents: generation.len(),
    })
}

async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> ApiResult<Json<SearchOutcome>> {
    let outcome =
        blocking(&state, move |engine| engine.search(&request)).await?;
    Ok(Json(outcome))
}

#[derive(Debug, Serialize)]
struct DocumentList {
    documents: Vec<Document>,
}

async fn list_documents(State(state): State<AppState>) -> Json<DocumentList> {
    Json(DocumentList {
        documents: state.engine.list_documents(),
    })
}

#[derive(Debug, Deserialize)]
struct ThumbnailQuery {
    key: Option<String>,
}

async fn thumbnail(
    State(state): State<AppState>,
    Path(doc_id): Path<i64>,
    Query(query): Query<ThumbnailQuery>,
) -> ApiResult<Response> {
    let png = blocking(&state, move |engine| {
        engine.thumbnail(doc_id, query.key.as_deref())
    })
    .await?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}

#[derive(Debug, Serialize)]
struct TagsResponse {
    message: String,
    tags: Vec<String>,
}

async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadOutcome>> {
    let bad_form = |e: axum::extract::multipart::MultipartError| {
        ApiError(Error::UnsupportedInput(format!("invalid form: {e}")))
    };

    let mut file: Option<(String, Vec<u8>)> = None;
    let mut tags = String::new();
    while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename =
                    field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(bad_form)?;
                file = Some((filename, bytes.to_vec()));
            }
            Some("tags") => {
                tags = field.text().await.map_err(bad_form)?;
            }
            _ => {}
        }
    }

    let Some((filename, bytes)) = file else {
        return Err(ApiError(Error::UnsupportedInput(
            "missing file field".to_string(),
        )));
    };

    let outcome =
        blocking(&state, move |engine| engine.upload(&filename, &bytes, &tags))
            .await?;
    Ok(Json(outcome))
}

async fn fetch_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> ApiResult<Response> {
    let is_pdf = crate::walker::is_supported(std::path::Path::new(&path));
    let content_type = if is_pdf {
        "application/pdf"
    } else {
        "application/octet-stream"
    };
    let bytes = blocking(&state, move |engine| engine.fetch_raw(&path)).await?;
    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}

#[derive(Debug, Deserialize)]
struct TagUpdate {
    tags: Vec<String>,
}

async fn update_tags(
    State(state): State<AppState>,
    Path(doc_id): Path<i64>,
    Json(update): Json<TagUpdate>,
) -> ApiResult<Json<TagsResponse>> {
    let tags =
        blocking(&state, move |engine| engine.set_tags(doc_id, update.tags))
            .await?;
    Ok(Json(TagsResponse {
        message: "Tags updated successfully".to_string(),
        tags,
    }))
}
