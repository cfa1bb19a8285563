use super::{BulkFetcher, Grouped};
use crate::models::{MediaItem, PostId};
use async_trait::async_trait;
use sqlx::PgPool;

pub const MEDIA_BY_POST_IDS: &str = r#"
    SELECT post_id::text AS post_id, s3_key, user_id, url, size, type
    FROM media_metadata
    WHERE post_id::text = ANY($1)
    ORDER BY post_id ASC, s3_key ASC
"#;

/// Media attachment metadata for a set of posts
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn media_by_post_ids(&self, ids: &[PostId]) -> Result<Grouped<MediaItem>, sqlx::Error>;
}

impl BulkFetcher<MediaItem> {
    pub fn media(pool: PgPool) -> Self {
        Self::new(pool, "media_metadata", MEDIA_BY_POST_IDS)
    }
}

#[async_trait]
impl MediaStore for BulkFetcher<MediaItem> {
    async fn media_by_post_ids(&self, ids: &[PostId]) -> Result<Grouped<MediaItem>, sqlx::Error> {
        self.fetch_by_post_ids(ids).await
    }
}
