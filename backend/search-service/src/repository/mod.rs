//! Bulk lookups of post children (comments, media) keyed by post id

mod comments;
mod media;

pub use comments::{CommentStore, COMMENTS_BY_POST_IDS};
pub use media::{MediaStore, MEDIA_BY_POST_IDS};

#[cfg(test)]
pub use comments::MockCommentStore;
#[cfg(test)]
pub use media::MockMediaStore;

use crate::models::{ForeignKeyed, PostId};
use db_pool::acquire_with_metrics;
use sqlx::{postgres::PgRow, FromRow, PgPool};
use std::collections::HashMap;
use std::marker::PhantomData;
use tracing::debug;

/// Rows grouped by their owning post
pub type Grouped<R> = HashMap<PostId, Vec<R>>;

/// One `WHERE post_id::text = ANY($1)` query against a single store.
///
/// The SQL must take the post id array (as `text[]`) as its only bind
/// parameter and select `post_id` as text.
pub struct BulkFetcher<R> {
    pool: PgPool,
    store: &'static str,
    sql: &'static str,
    _row: PhantomData<fn() -> R>,
}

impl<R> BulkFetcher<R>
where
    R: for<'r> FromRow<'r, PgRow> + ForeignKeyed + Send + Unpin,
{
    pub fn new(pool: PgPool, store: &'static str, sql: &'static str) -> Self {
        Self {
            pool,
            store,
            sql,
            _row: PhantomData,
        }
    }

    /// Fetch every row for `ids`, grouped by post id.
    ///
    /// An empty id set returns an empty map without touching the pool. Posts
    /// with no rows are absent from the map.
    pub async fn fetch_by_post_ids(&self, ids: &[PostId]) -> Result<Grouped<R>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let raw_ids: Vec<String> = ids.iter().map(PostId::to_string).collect();

        // connection returns to the pool when dropped, on every path
        let mut conn = acquire_with_metrics(&self.pool, self.store).await?;
        let rows = sqlx::query_as::<_, R>(self.sql)
            .bind(&raw_ids)
            .fetch_all(&mut *conn)
            .await?;

        debug!(
            store = self.store,
            post_ids = ids.len(),
            rows = rows.len(),
            "Bulk fetch completed"
        );

        Ok(group_by_post_id(rows))
    }
}

/// Group rows by post id, keeping store order inside each group.
pub fn group_by_post_id<R: ForeignKeyed>(rows: Vec<R>) -> Grouped<R> {
    let mut grouped: Grouped<R> = HashMap::new();
    for row in rows {
        grouped.entry(row.post_id().clone()).or_default().push(row);
    }
    grouped
}
