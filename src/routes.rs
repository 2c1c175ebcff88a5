use crate::error::AppError;
use crate::flash::{clear_cookie, redirect_with_flash, Flash};
use crate::images::ImageStore;
use crate::lifecycle::LinkLifecycleManager;
use crate::model::{CurrentUser, Link, LinkId};
use crate::store::LinkStore;
use crate::upload::LinkForm;
use async_trait::async_trait;
use axum::extract::{FromRef, FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::{Extension, Json};
use serde::Serialize;
use std::sync::Arc;

const ADD_FORM: &str = r#"<!doctype html>
<html>
<body>
<form action="/links/add" method="post" enctype="multipart/form-data">
    <input type="text" name="title" placeholder="Title" required>
    <textarea name="description" placeholder="Description" required></textarea>
    <input type="file" name="image" accept="image/*">
    <button type="submit">Save</button>
</form>
</body>
</html>
"#;

#[derive(Clone)]
pub struct AppState {
    pub links: Arc<LinkLifecycleManager>,
    pub store: Arc<dyn LinkStore>,
    pub images: ImageStore,
}

impl AppState {
    pub fn new(store: Arc<dyn LinkStore>, images: ImageStore) -> Self {
        Self {
            links: Arc::new(LinkLifecycleManager::new(store.clone(), images.clone())),
            store,
            images,
        }
    }
}

impl FromRef<AppState> for ImageStore {
    fn from_ref(state: &AppState) -> Self {
        state.images.clone()
    }
}

/// `:id` path segment. An id that does not parse names no link, so it is
/// `None` rather than a rejection.
pub struct LinkIdParam(pub Option<LinkId>);

#[async_trait]
impl<S> FromRequestParts<S> for LinkIdParam
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw_id) = Path::<String>::from_request_parts(parts, state).await?;
        Ok(Self(raw_id.parse().ok()))
    }
}

#[derive(Serialize)]
pub struct LinkListing {
    pub flash: Option<Flash>,
    pub links: Vec<Link>,
}

pub async fn add_form() -> Html<&'static str> {
    Html(ADD_FORM)
}

pub async fn create_link(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    form: LinkForm,
) -> Result<Response, AppError> {
    state
        .links
        .create(&form.title, &form.description, form.image, user_id)
        .await?;
    Ok(redirect_with_flash(Flash::success("Link Saved Successfully")))
}

pub async fn list_links(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let links = state.links.list(user_id).await?;
    let flash = Flash::from_headers(&headers);
    let mut response = Json(LinkListing {
        flash: flash.clone(),
        links,
    })
    .into_response();
    if flash.is_some() {
        if let Ok(value) = clear_cookie().parse() {
            response.headers_mut().insert(SET_COOKIE, value);
        }
    }
    Ok(response)
}

pub async fn delete_link(
    State(state): State<AppState>,
    LinkIdParam(link_id): LinkIdParam,
) -> Result<Response, AppError> {
    if let Some(link_id) = link_id {
        state.links.delete(link_id).await?;
    }
    Ok(redirect_with_flash(Flash::success("Link Removed Successfully")))
}

pub async fn edit_form(
    State(state): State<AppState>,
    LinkIdParam(link_id): LinkIdParam,
) -> Result<Json<Option<Link>>, AppError> {
    let Some(link_id) = link_id else {
        return Ok(Json(None));
    };
    Ok(Json(state.links.get_for_edit(link_id).await?))
}

pub async fn update_link(
    State(state): State<AppState>,
    LinkIdParam(link_id): LinkIdParam,
    form: LinkForm,
) -> Result<Response, AppError> {
    match link_id {
        Some(link_id) => {
            state
                .links
                .update(link_id, &form.title, &form.description, form.image)
                .await?
        }
        None => {
            if let Some(file_name) = form.image {
                state.images.discard(&file_name).await;
            }
        }
    }
    Ok(redirect_with_flash(Flash::success("Link Updated Successfully")))
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
