use crate::dao;
use crate::model::{ImageRef, Link, LinkId, UserId};
use async_trait::async_trait;
use sqlx::{Error, Pool, Postgres};

/// Persistence for link records and the users owning them.
#[async_trait]
pub trait LinkStore: Send + Sync {
    async fn insert(
        &self,
        title: &str,
        description: &str,
        url: Option<&str>,
        user_id: UserId,
    ) -> Result<Link, Error>;

    async fn list_by_owner(&self, user_id: UserId) -> Result<Vec<Link>, Error>;

    async fn get_by_id(&self, id: LinkId) -> Result<Option<Link>, Error>;

    /// Overwrites title and description, and the url only when one is given.
    /// Returns the url held before the update, or `None` when no row matched.
    async fn update(
        &self,
        id: LinkId,
        title: &str,
        description: &str,
        url: Option<&str>,
    ) -> Result<Option<ImageRef>, Error>;

    /// Returns the url of the deleted row, or `None` when no row matched.
    async fn delete(&self, id: LinkId) -> Result<Option<ImageRef>, Error>;

    async fn image_names(&self) -> Result<Vec<String>, Error>;

    async fn find_user_by_api_key_hash(&self, api_key_hash: &str)
        -> Result<Option<UserId>, Error>;
}

#[derive(Clone)]
pub struct PgLinkStore {
    db_connection_pool: Pool<Postgres>,
}

impl PgLinkStore {
    pub fn new(db_connection_pool: Pool<Postgres>) -> Self {
        Self { db_connection_pool }
    }
}

#[async_trait]
impl LinkStore for PgLinkStore {
    async fn insert(
        &self,
        title: &str,
        description: &str,
        url: Option<&str>,
        user_id: UserId,
    ) -> Result<Link, Error> {
        dao::save(&self.db_connection_pool, title, description, url, user_id).await
    }

    async fn list_by_owner(&self, user_id: UserId) -> Result<Vec<Link>, Error> {
        dao::get_by_owner(&self.db_connection_pool, user_id).await
    }

    async fn get_by_id(&self, id: LinkId) -> Result<Option<Link>, Error> {
        dao::get_by_id(&self.db_connection_pool, id).await
    }

    async fn update(
        &self,
        id: LinkId,
        title: &str,
        description: &str,
        url: Option<&str>,
    ) -> Result<Option<ImageRef>, Error> {
        dao::update(&self.db_connection_pool, id, title, description, url).await
    }

    async fn delete(&self, id: LinkId) -> Result<Option<ImageRef>, Error> {
        dao::delete(&self.db_connection_pool, id).await
    }

    async fn image_names(&self) -> Result<Vec<String>, Error> {
        dao::get_image_names(&self.db_connection_pool).await
    }

    async fn find_user_by_api_key_hash(
        &self,
        api_key_hash: &str,
    ) -> Result<Option<UserId>, Error> {
        dao::get_user_by_api_key_hash(&self.db_connection_pool, api_key_hash).await
    }
}
