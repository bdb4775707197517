//! API endpoints for secret creation, retrieval, and deletion.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::secrets::{NewSecret, NewSecretFile, SecretError, SecretPage, SortField, SortOrder};

use super::routes::AppState;

/// Create the secrets API routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/create", post(create_secret))
        .route("/count", get(secret_count))
        .route("/user-secrets", get(user_secrets))
        .route("/:id", post(retrieve_secret))
        .route("/:id/download", post(download_file))
        .route("/delete/:id", post(delete_secret))
}

/// Map a lifecycle error to an HTTP response tuple. Storage details stay in
/// the log; callers only see a generic 500.
fn error_response(err: SecretError) -> (StatusCode, String) {
    match &err {
        SecretError::Validation(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        SecretError::NotFound => (StatusCode::NOT_FOUND, err.to_string()),
        SecretError::InvalidPassword => (StatusCode::UNAUTHORIZED, err.to_string()),
        SecretError::RetrievalsExhausted => (StatusCode::FORBIDDEN, err.to_string()),
        SecretError::Storage(detail) => {
            tracing::error!("storage failure: {}", detail);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateSecretResponse {
    pub id: Uuid,
    pub message: String,
}

/// POST /api/secrets/create
/// Create a secret from a multipart form: `content`, `password`, optional
/// `lifetime` (days), `max_retrievals`, `created_by`, and `file`.
async fn create_secret(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<CreateSecretResponse>, (StatusCode, String)> {
    let mut content = None;
    let mut password = None;
    let mut lifetime_days = None;
    let mut max_retrievals = None;
    let mut created_by = None;
    let mut file = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "content" => content = Some(read_text(field).await?),
            "password" => password = Some(read_text(field).await?),
            "lifetime" => lifetime_days = read_integer("lifetime", field).await?,
            "max_retrievals" => max_retrievals = read_integer("max_retrievals", field).await?,
            "created_by" => {
                let value = read_text(field).await?;
                if !value.trim().is_empty() {
                    created_by = Some(value.trim().to_string());
                }
            }
            "file" => {
                let file_name = field
                    .file_name()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "upload.bin".to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
                if !data.is_empty() {
                    file = Some(NewSecretFile {
                        data: data.to_vec(),
                        original_file_name: file_name,
                    });
                }
            }
            _ => {}
        }
    }

    let request = NewSecret {
        content: content.unwrap_or_default(),
        password: password.unwrap_or_default(),
        file,
        lifetime_days,
        max_retrievals,
        created_by,
    };

    let id = state
        .secrets
        .create(request)
        .await
        .map_err(error_response)?;

    Ok(Json(CreateSecretResponse {
        id,
        message: "Secret created successfully".to_string(),
    }))
}

async fn read_text(
    field: axum::extract::multipart::Field<'_>,
) -> Result<String, (StatusCode, String)> {
    field
        .text()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
}

async fn read_integer(
    name: &'static str,
    field: axum::extract::multipart::Field<'_>,
) -> Result<Option<i64>, (StatusCode, String)> {
    let raw = read_text(field).await?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse()
        .map(Some)
        .map_err(|_| (StatusCode::BAD_REQUEST, format!("{} must be an integer", name)))
}

#[derive(Debug, Deserialize)]
pub struct PasswordRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct FilePayload {
    pub original_file_name: String,
    /// Base64-encoded plaintext bytes.
    pub data: String,
}

#[derive(Debug, Serialize)]
pub struct RetrieveSecretResponse {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<FilePayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retrievals: Option<i64>,
    pub retrieval_count: i64,
    pub created_at: DateTime<Utc>,
}

/// POST /api/secrets/:id
/// Retrieve and decrypt a secret. Consumes one unit of its budget.
async fn retrieve_secret(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<PasswordRequest>,
) -> Result<Json<RetrieveSecretResponse>, (StatusCode, String)> {
    if req.password.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Password is required".to_string()));
    }

    let secret = state
        .secrets
        .retrieve(id, &req.password, false)
        .await
        .map_err(error_response)?;

    Ok(Json(RetrieveSecretResponse {
        content: secret.content,
        file: secret.file.map(|f| FilePayload {
            original_file_name: f.original_file_name,
            data: BASE64.encode(&f.data),
        }),
        expiration_date: secret.expiration_date,
        max_retrievals: secret.max_retrievals,
        retrieval_count: secret.retrieval_count,
        created_at: secret.created_at,
    }))
}

/// POST /api/secrets/:id/download
/// Stream the decrypted file attachment. Does not consume the retrieval
/// budget; the canonical retrieval event is the content fetch.
async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<PasswordRequest>,
) -> Result<Response, (StatusCode, String)> {
    if req.password.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Password is required".to_string()));
    }

    let secret = state
        .secrets
        .retrieve(id, &req.password, true)
        .await
        .map_err(error_response)?;

    let file = secret.file.ok_or((
        StatusCode::NOT_FOUND,
        "No file attached to this secret".to_string(),
    ))?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_DISPOSITION,
        format!(
            "attachment; filename=\"{}\"",
            sanitize_filename(&file.original_file_name)
        )
        .parse()
        .unwrap_or(HeaderValue::from_static("attachment")),
    );
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );

    Ok((headers, Body::from(file.data)).into_response())
}

/// Sanitize a file name for use in a Content-Disposition header.
fn sanitize_filename(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.') {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    if out.is_empty() {
        "download.bin".to_string()
    } else {
        out
    }
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: u64,
}

/// GET /api/secrets/count
/// Total number of stored secrets.
async fn secret_count(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CountResponse>, (StatusCode, String)> {
    let count = state.secrets.count().await.map_err(error_response)?;
    Ok(Json(CountResponse { count }))
}

fn default_page() -> u64 {
    1
}

fn default_limit() -> u64 {
    10
}

#[derive(Debug, Deserialize)]
pub struct UserSecretsQuery {
    pub email: String,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub sort_by: Option<String>,
    pub order: Option<String>,
}

/// GET /api/secrets/user-secrets
/// Page through one creator's secrets. Metadata only, never ciphertext.
async fn user_secrets(
    State(state): State<Arc<AppState>>,
    Query(q): Query<UserSecretsQuery>,
) -> Result<Json<SecretPage>, (StatusCode, String)> {
    let sort = match q.sort_by.as_deref() {
        None => SortField::default(),
        Some(s) => SortField::parse(s).ok_or((
            StatusCode::BAD_REQUEST,
            format!("Unknown sort field: {}", s),
        ))?,
    };
    let order = match q.order.as_deref() {
        None => SortOrder::default(),
        Some(s) => SortOrder::parse(s).ok_or((
            StatusCode::BAD_REQUEST,
            format!("Unknown sort order: {}", s),
        ))?,
    };

    let page = state
        .secrets
        .list_by_creator(&q.email, q.page, q.limit, sort, order)
        .await
        .map_err(error_response)?;

    Ok(Json(page))
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// POST /api/secrets/delete/:id
/// Delete a secret; the password proves possession. No content is returned.
async fn delete_secret(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<PasswordRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    if req.password.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Password is required".to_string()));
    }

    state
        .secrets
        .delete(id, &req.password)
        .await
        .map_err(error_response)?;

    Ok(Json(MessageResponse {
        message: "Secret deleted successfully".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames_are_header_safe() {
        assert_eq!(sanitize_filename("notes.txt"), "notes.txt");
        assert_eq!(sanitize_filename("my report (v2).pdf"), "my_report__v2_.pdf");
        assert_eq!(sanitize_filename("\"quoted\"\r\n"), "_quoted___");
        assert_eq!(sanitize_filename(""), "download.bin");
    }
}
