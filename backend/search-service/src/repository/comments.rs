use super::{BulkFetcher, Grouped};
use crate::models::{Comment, PostId};
use async_trait::async_trait;
use sqlx::PgPool;

pub const COMMENTS_BY_POST_IDS: &str = r#"
    SELECT id, post_id::text AS post_id, user_id, username, content, created_at
    FROM comments
    WHERE post_id::text = ANY($1)
    ORDER BY created_at ASC, id ASC
"#;

/// Comments for a set of posts
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn comments_by_post_ids(&self, ids: &[PostId]) -> Result<Grouped<Comment>, sqlx::Error>;
}

impl BulkFetcher<Comment> {
    pub fn comments(pool: PgPool) -> Self {
        Self::new(pool, "comments", COMMENTS_BY_POST_IDS)
    }
}

#[async_trait]
impl CommentStore for BulkFetcher<Comment> {
    async fn comments_by_post_ids(&self, ids: &[PostId]) -> Result<Grouped<Comment>, sqlx::Error> {
        self.fetch_by_post_ids(ids).await
    }
}
