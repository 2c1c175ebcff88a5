use crate::error::AppError;
use crate::model::CurrentUser;
use crate::routes::AppState;
use crate::utils::{get_header, hash_api_key};
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Resolves the caller from the `x-api-key` header and rejects unknown ones.
pub async fn auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let api_key = get_header(API_KEY_HEADER, request.headers())
        .filter(|key| !key.is_empty())
        .ok_or(AppError::Unauthorized)?;
    let user_id = state
        .store
        .find_user_by_api_key_hash(&hash_api_key(&api_key))
        .await?
        .ok_or_else(|| {
            tracing::debug!("Rejected unknown api key");
            AppError::Unauthorized
        })?;
    request.extensions_mut().insert(CurrentUser(user_id));
    Ok(next.run(request).await)
}
