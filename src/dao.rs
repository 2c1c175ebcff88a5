use crate::model::{ImageRef, Link, LinkId, UserId};
use sqlx::{Error, Pool, Postgres};

pub async fn save(
    db_connection_pool: &Pool<Postgres>,
    title: &str,
    description: &str,
    url: Option<&str>,
    user_id: UserId,
) -> Result<Link, Error> {
    sqlx::query_as(
        r#"
              insert into links(title, description, url, user_id) values ($1, $2, $3, $4)
              returning id, title, description, url, user_id, created_at
            "#,
    )
    .bind(title)
    .bind(description)
    .bind(url)
    .bind(user_id)
    .fetch_one(db_connection_pool)
    .await
}

pub async fn get_by_owner(
    db_connection_pool: &Pool<Postgres>,
    user_id: UserId,
) -> Result<Vec<Link>, Error> {
    sqlx::query_as(
        "select id, title, description, url, user_id, created_at from links where user_id = $1",
    )
    .bind(user_id)
    .fetch_all(db_connection_pool)
    .await
}

pub async fn get_by_id(
    db_connection_pool: &Pool<Postgres>,
    id: LinkId,
) -> Result<Option<Link>, Error> {
    sqlx::query_as("select id, title, description, url, user_id, created_at from links where id = $1")
        .bind(id)
        .fetch_optional(db_connection_pool)
        .await
}

/// Returns the url the row held before this statement. The CTE takes the row
/// lock first, so a concurrent update is waited for and its url is the one
/// reported, never a stale snapshot.
pub async fn update(
    db_connection_pool: &Pool<Postgres>,
    id: LinkId,
    title: &str,
    description: &str,
    url: Option<&str>,
) -> Result<Option<ImageRef>, Error> {
    sqlx::query_as(
        r#"
              with previous as (
                  select id, url from links where id = $4 for update
              )
              update links set title = $1, description = $2, url = coalesce($3, previous.url)
              from previous
              where links.id = previous.id
              returning previous.url
            "#,
    )
    .bind(title)
    .bind(description)
    .bind(url)
    .bind(id)
    .fetch_optional(db_connection_pool)
    .await
}

pub async fn delete(
    db_connection_pool: &Pool<Postgres>,
    id: LinkId,
) -> Result<Option<ImageRef>, Error> {
    sqlx::query_as("delete from links where id = $1 returning url")
        .bind(id)
        .fetch_optional(db_connection_pool)
        .await
}

pub async fn get_image_names(db_connection_pool: &Pool<Postgres>) -> Result<Vec<String>, Error> {
    sqlx::query_scalar("select url from links where url is not null and url <> ''")
        .fetch_all(db_connection_pool)
        .await
}

pub async fn get_user_by_api_key_hash(
    db_connection_pool: &Pool<Postgres>,
    api_key_hash: &str,
) -> Result<Option<UserId>, Error> {
    sqlx::query_scalar("select id from users where api_key_hash = $1")
        .bind(api_key_hash)
        .fetch_optional(db_connection_pool)
        .await
}
