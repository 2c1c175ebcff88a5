use crate::error::AppError;
use crate::images::{ImageStore, IMAGE_FIELD};
use async_trait::async_trait;
use axum::extract::multipart::Field;
use axum::extract::{FromRef, FromRequest, Multipart, Request};
use tokio::io::AsyncWriteExt;

/// Fields of the add/edit form. Any uploaded image is already on disk under
/// `image` by the time a handler sees this.
#[derive(Debug, Default)]
pub struct LinkForm {
    pub title: String,
    pub description: String,
    pub image: Option<String>,
}

#[async_trait]
impl<S> FromRequest<S> for LinkForm
where
    ImageStore: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let images = ImageStore::from_ref(state);
        let multipart = Multipart::from_request(request, state).await?;
        let mut form = LinkForm::default();
        if let Err(err) = read_fields(multipart, &images, &mut form).await {
            if let Some(file_name) = form.image.take() {
                images.discard(&file_name).await;
            }
            return Err(err);
        }
        Ok(form)
    }
}

async fn read_fields(
    mut multipart: Multipart,
    images: &ImageStore,
    form: &mut LinkForm,
) -> Result<(), AppError> {
    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("title") => form.title = field.text().await?,
            Some("description") => form.description = field.text().await?,
            Some(IMAGE_FIELD) if form.image.is_none() => store_image(field, images, form).await?,
            _ => {}
        }
    }
    Ok(())
}

/// Streams the image part to disk. A part without a file name is the
/// browser's way of saying no file was chosen.
async fn store_image(
    mut field: Field<'_>,
    images: &ImageStore,
    form: &mut LinkForm,
) -> Result<(), AppError> {
    let original_name = match field.file_name() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => return Ok(()),
    };
    let mut staged = images.stage(&original_name).await?;
    // Recorded before writing so a failed write still gets cleaned up.
    form.image = Some(staged.file_name.clone());
    while let Some(chunk) = field.chunk().await? {
        staged.file.write_all(&chunk).await?;
    }
    staged.file.flush().await?;
    Ok(())
}
