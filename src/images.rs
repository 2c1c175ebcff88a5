use crate::utils::generate_id;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::fs::{self, File};

pub const IMAGE_FIELD: &str = "image";

/// Source of the unique part of generated image file names.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn generate(&self) -> String {
        generate_id()
    }
}

/// Flat directory holding every uploaded image. Files are referenced by name
/// only, through the `url` column of a link.
#[derive(Clone)]
pub struct ImageStore {
    directory: PathBuf,
    id_generator: Arc<dyn IdGenerator>,
}

/// A file created for an upload that no link references yet.
pub struct StagedFile {
    pub file_name: String,
    pub file: File,
}

impl ImageStore {
    pub fn new(directory: impl Into<PathBuf>, id_generator: Arc<dyn IdGenerator>) -> Self {
        Self {
            directory: directory.into(),
            id_generator,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub async fn ensure_directory(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.directory).await
    }

    pub fn generate_file_name(&self, original_name: &str) -> String {
        format!(
            "{}-{}{}",
            IMAGE_FIELD,
            self.id_generator.generate(),
            extension_of(original_name)
        )
    }

    pub async fn stage(&self, original_name: &str) -> std::io::Result<StagedFile> {
        let file_name = self.generate_file_name(original_name);
        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.directory.join(&file_name))
            .await?;
        tracing::debug!("Staged upload {} as {}", original_name, file_name);
        Ok(StagedFile { file_name, file })
    }

    /// Removes a staged file that never got referenced by a link.
    pub async fn discard(&self, file_name: &str) {
        match fs::remove_file(self.directory.join(file_name)).await {
            Ok(()) => tracing::debug!("Discarded staged upload {}", file_name),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => tracing::error!("Discarding staged upload {} failed: {}", file_name, err),
        }
    }

    /// Best-effort delete of a referenced image. Never fails the caller.
    pub async fn remove(&self, file_name: &str) {
        let Some(path) = self.resolve(file_name) else {
            tracing::error!("Refusing to delete image outside of image directory: {}", file_name);
            return;
        };
        match fs::remove_file(&path).await {
            Ok(()) => tracing::debug!("Deleted image {}", path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::warn!("Image file does not exist at path: {}", path.display())
            }
            Err(err) => tracing::error!("Deleting image {} failed: {}", path.display(), err),
        }
    }

    /// Deletes files no link references and that are older than `grace`,
    /// returning how many were removed.
    pub async fn sweep_orphans(
        &self,
        referenced: &HashSet<String>,
        grace: Duration,
    ) -> std::io::Result<usize> {
        let cutoff = SystemTime::now()
            .checked_sub(grace)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let mut removed = 0;
        let mut entries = fs::read_dir(&self.directory).await?;
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() || metadata.modified()? > cutoff {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if referenced.contains(&name) {
                continue;
            }
            match fs::remove_file(entry.path()).await {
                Ok(()) => {
                    tracing::info!("Removed orphaned image {}", name);
                    removed += 1;
                }
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(err),
            }
        }
        Ok(removed)
    }

    fn resolve(&self, file_name: &str) -> Option<PathBuf> {
        let is_plain = !file_name.is_empty()
            && file_name != "."
            && file_name != ".."
            && !file_name.contains(['/', '\\']);
        is_plain.then(|| self.directory.join(file_name))
    }
}

fn extension_of(original_name: &str) -> String {
    Path::new(original_name)
        .extension()
        .and_then(|extension| extension.to_str())
        .filter(|extension| {
            !extension.is_empty() && extension.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|extension| format!(".{}", extension.to_ascii_lowercase()))
        .unwrap_or_default()
}
