//! Keeps link records and their image files in step.
//!
//! A non-empty `url` on a stored link always names a file in the image
//! directory. New files are staged before the row referencing them is
//! written; old files are removed only after the row stopped referencing
//! them. Files that fail to get referenced are discarded, and anything left
//! behind by a crash is collected by the orphan sweep.
//!
//! Delete and update do not check that the caller owns the link; only the
//! listing is scoped to its owner.

use crate::error::AppError;
use crate::images::ImageStore;
use crate::model::{Link, LinkId, UserId};
use crate::store::LinkStore;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

pub struct LinkLifecycleManager {
    store: Arc<dyn LinkStore>,
    images: ImageStore,
}

impl LinkLifecycleManager {
    pub fn new(store: Arc<dyn LinkStore>, images: ImageStore) -> Self {
        Self { store, images }
    }

    /// `image` is the name of a file already staged in the image directory.
    pub async fn create(
        &self,
        title: &str,
        description: &str,
        image: Option<String>,
        owner: UserId,
    ) -> Result<Link, AppError> {
        match self
            .store
            .insert(title, description, image.as_deref(), owner)
            .await
        {
            Ok(link) => {
                tracing::debug!("Created link {} for user {}", link.id, owner);
                Ok(link)
            }
            Err(err) => {
                self.discard(image).await;
                Err(err.into())
            }
        }
    }

    pub async fn list(&self, owner: UserId) -> Result<Vec<Link>, AppError> {
        Ok(self.store.list_by_owner(owner).await?)
    }

    pub async fn get_for_edit(&self, id: LinkId) -> Result<Option<Link>, AppError> {
        Ok(self.store.get_by_id(id).await?)
    }

    pub async fn update(
        &self,
        id: LinkId,
        title: &str,
        description: &str,
        image: Option<String>,
    ) -> Result<(), AppError> {
        let previous = match self
            .store
            .update(id, title, description, image.as_deref())
            .await
        {
            Ok(previous) => previous,
            Err(err) => {
                self.discard(image).await;
                return Err(err.into());
            }
        };
        let Some(previous) = previous else {
            tracing::debug!("Update of missing link {} ignored", id);
            self.discard(image).await;
            return Ok(());
        };
        if let Some(new_file) = image.as_deref() {
            match previous.file_name() {
                Some(old_file) if old_file != new_file => self.images.remove(old_file).await,
                _ => {}
            }
        }
        Ok(())
    }

    pub async fn delete(&self, id: LinkId) -> Result<(), AppError> {
        match self.store.delete(id).await? {
            Some(removed) => {
                if let Some(file_name) = removed.file_name() {
                    self.images.remove(file_name).await;
                }
                tracing::debug!("Deleted link {}", id);
            }
            None => tracing::debug!("Delete of missing link {} ignored", id),
        }
        Ok(())
    }

    /// Removes image files that no link references, sparing anything newer
    /// than `grace` since it may belong to a request still in flight.
    pub async fn sweep_orphaned_images(&self, grace: Duration) -> Result<usize, AppError> {
        let referenced: HashSet<String> = self.store.image_names().await?.into_iter().collect();
        Ok(self.images.sweep_orphans(&referenced, grace).await?)
    }

    async fn discard(&self, image: Option<String>) {
        if let Some(file_name) = image {
            self.images.discard(&file_name).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::testing::SequentialIdGenerator;
    use crate::store::memory::InMemoryLinkStore;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        store: Arc<InMemoryLinkStore>,
        images: ImageStore,
        manager: LinkLifecycleManager,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(InMemoryLinkStore::default());
        let images = ImageStore::new(dir.path(), Arc::new(SequentialIdGenerator::default()));
        let manager = LinkLifecycleManager::new(store.clone(), images.clone());
        Fixture {
            dir,
            store,
            images,
            manager,
        }
    }

    impl Fixture {
        async fn upload(&self, original_name: &str) -> String {
            let staged = self.images.stage(original_name).await.unwrap();
            staged.file_name
        }

        fn exists(&self, file_name: &str) -> bool {
            self.dir.path().join(file_name).exists()
        }
    }

    #[tokio::test]
    async fn create_with_image_references_staged_file() {
        let f = fixture();
        let image = f.upload("a.png").await;

        let link = f.manager.create("A", "d", Some(image), 1).await.unwrap();

        assert_eq!(link.title, "A");
        assert_eq!(link.user_id, 1);
        assert_eq!(link.url.as_deref(), Some("image-1.png"));
        assert!(f.exists("image-1.png"));
    }

    #[tokio::test]
    async fn create_without_image_has_no_url() {
        let f = fixture();

        let link = f.manager.create("A", "d", None, 1).await.unwrap();

        assert_eq!(link.url, None);
        assert_eq!(std::fs::read_dir(f.dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn failed_create_discards_staged_image() {
        let f = fixture();
        let image = f.upload("a.png").await;
        f.store.fail_writes();

        let result = f.manager.create("A", "d", Some(image), 1).await;

        assert!(matches!(result, Err(AppError::Database(_))));
        assert!(!f.exists("image-1.png"));
    }

    #[tokio::test]
    async fn list_is_scoped_to_owner() {
        let f = fixture();
        f.manager.create("mine", "d", None, 1).await.unwrap();
        f.manager.create("theirs", "d", None, 2).await.unwrap();

        let links = f.manager.list(1).await.unwrap();

        assert_eq!(links.len(), 1);
        assert!(links.iter().all(|link| link.user_id == 1));
    }

    #[tokio::test]
    async fn delete_removes_record_and_file() {
        let f = fixture();
        let image = f.upload("a.png").await;
        let link = f.manager.create("A", "d", Some(image), 1).await.unwrap();

        f.manager.delete(link.id).await.unwrap();

        assert!(f.manager.list(1).await.unwrap().is_empty());
        assert!(!f.exists("image-1.png"));
    }

    #[tokio::test]
    async fn delete_with_missing_file_still_removes_record() {
        let f = fixture();
        let image = f.upload("a.png").await;
        let link = f.manager.create("A", "d", Some(image), 1).await.unwrap();
        std::fs::remove_file(f.dir.path().join("image-1.png")).unwrap();

        f.manager.delete(link.id).await.unwrap();

        assert!(f.store.all().is_empty());
    }

    #[tokio::test]
    async fn delete_of_unknown_id_is_a_no_op() {
        let f = fixture();
        f.manager.create("A", "d", None, 1).await.unwrap();

        f.manager.delete(42).await.unwrap();

        assert_eq!(f.store.all().len(), 1);
    }

    #[tokio::test]
    async fn get_for_edit_of_unknown_id_is_none() {
        let f = fixture();
        assert_eq!(f.manager.get_for_edit(7).await.unwrap(), None);
    }

    #[tokio::test]
    async fn update_without_image_keeps_url_and_file() {
        let f = fixture();
        let image = f.upload("a.png").await;
        let link = f.manager.create("A", "d", Some(image), 1).await.unwrap();

        f.manager.update(link.id, "B", "d2", None).await.unwrap();

        let updated = f.manager.get_for_edit(link.id).await.unwrap().unwrap();
        assert_eq!(updated.title, "B");
        assert_eq!(updated.description, "d2");
        assert_eq!(updated.url.as_deref(), Some("image-1.png"));
        assert_eq!(updated.user_id, 1);
        assert!(f.exists("image-1.png"));
    }

    #[tokio::test]
    async fn update_with_image_replaces_old_file() {
        let f = fixture();
        let first = f.upload("a.png").await;
        let link = f.manager.create("A", "d", Some(first), 1).await.unwrap();
        let second = f.upload("b.jpg").await;

        f.manager.update(link.id, "B", "d2", Some(second)).await.unwrap();

        let updated = f.manager.get_for_edit(link.id).await.unwrap().unwrap();
        assert_eq!(updated.url.as_deref(), Some("image-2.jpg"));
        assert!(!f.exists("image-1.png"));
        assert!(f.exists("image-2.jpg"));
    }

    #[tokio::test]
    async fn update_adds_image_to_link_without_one() {
        let f = fixture();
        let link = f.manager.create("A", "d", None, 1).await.unwrap();
        let image = f.upload("b.png").await;

        f.manager.update(link.id, "A", "d", Some(image)).await.unwrap();

        let updated = f.manager.get_for_edit(link.id).await.unwrap().unwrap();
        assert_eq!(updated.url.as_deref(), Some("image-1.png"));
        assert!(f.exists("image-1.png"));
    }

    #[tokio::test]
    async fn update_of_unknown_id_discards_new_image() {
        let f = fixture();
        let image = f.upload("b.png").await;

        f.manager.update(99, "B", "d2", Some(image)).await.unwrap();

        assert!(!f.exists("image-1.png"));
    }

    #[tokio::test]
    async fn failed_update_keeps_old_file_and_discards_new() {
        let f = fixture();
        let first = f.upload("a.png").await;
        let link = f.manager.create("A", "d", Some(first), 1).await.unwrap();
        let second = f.upload("b.png").await;
        f.store.fail_writes();

        let result = f.manager.update(link.id, "B", "d2", Some(second)).await;

        assert!(result.is_err());
        assert!(f.exists("image-1.png"));
        assert!(!f.exists("image-2.png"));
        assert_eq!(f.store.all()[0].url.as_deref(), Some("image-1.png"));
    }

    #[tokio::test]
    async fn sweep_keeps_referenced_images() {
        let f = fixture();
        let image = f.upload("a.png").await;
        f.manager.create("A", "d", Some(image), 1).await.unwrap();
        f.upload("lost.png").await;

        let removed = f.manager.sweep_orphaned_images(Duration::ZERO).await.unwrap();

        assert_eq!(removed, 1);
        assert!(f.exists("image-1.png"));
        assert!(!f.exists("image-2.png"));
    }
}
