//! Search result aggregation
//!
//! query → search index → partition → {post ids} → comments + media
//! (concurrently) → merge. Any collaborator failure aborts the whole
//! aggregation; there is no partial result.

use crate::elasticsearch::{SearchIndex, SearchScope};
use crate::error::AggregateError;
use crate::models::{AggregationResult, Comment, MediaItem, PostId, PostRecord};
use crate::partition::{partition, Partitioned};
use crate::repository::{CommentStore, Grouped, MediaStore};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, field, info, instrument};

pub struct Aggregator {
    search: Arc<dyn SearchIndex>,
    comments: Arc<dyn CommentStore>,
    media: Arc<dyn MediaStore>,
}

impl Aggregator {
    pub fn new(
        search: Arc<dyn SearchIndex>,
        comments: Arc<dyn CommentStore>,
        media: Arc<dyn MediaStore>,
    ) -> Self {
        Self {
            search,
            comments,
            media,
        }
    }

    /// Search `username` and `content` and enrich the matching posts.
    pub async fn aggregate(&self, query: &str) -> Result<AggregationResult, AggregateError> {
        self.aggregate_scoped(query, SearchScope::All).await
    }

    #[instrument(skip(self), fields(hits = field::Empty, post_ids = field::Empty))]
    pub async fn aggregate_scoped(
        &self,
        query: &str,
        scope: SearchScope,
    ) -> Result<AggregationResult, AggregateError> {
        let start = Instant::now();

        let hits = self.search.search(query, scope).await.map_err(|e| {
            error!(error = %e, "Search index query failed");
            AggregateError::SearchUnavailable(e)
        })?;
        tracing::Span::current().record("hits", hits.len());

        let Partitioned {
            post_ids,
            users,
            posts,
        } = partition(hits);

        if post_ids.is_empty() {
            info!(users = users.len(), "No post hits; skipping enrichment");
            return Ok(AggregationResult {
                users,
                posts: Vec::new(),
            });
        }
        tracing::Span::current().record("post_ids", post_ids.len());

        let (comments, media) = self.fetch_children(&post_ids).await?;
        let posts = merge_children(posts, &comments, &media);

        info!(
            users = users.len(),
            posts = posts.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Aggregation completed"
        );

        Ok(AggregationResult { users, posts })
    }

    /// Comments and media have no dependency on each other and are awaited
    /// together. The first failure wins; the other lookup is dropped and its
    /// result discarded.
    async fn fetch_children(
        &self,
        post_ids: &[PostId],
    ) -> Result<(Grouped<Comment>, Grouped<MediaItem>), AggregateError> {
        let comments = async {
            self.comments
                .comments_by_post_ids(post_ids)
                .await
                .map_err(|e| {
                    error!(error = %e, "Comment lookup failed");
                    AggregateError::CommentStore(e)
                })
        };
        let media = async {
            self.media.media_by_post_ids(post_ids).await.map_err(|e| {
                error!(error = %e, "Media lookup failed");
                AggregateError::MediaStore(e)
            })
        };

        tokio::try_join!(comments, media)
    }
}

/// Attach each post's comments and media by id; posts without rows get
/// empty sequences.
fn merge_children(
    posts: Vec<PostRecord>,
    comments: &Grouped<Comment>,
    media: &Grouped<MediaItem>,
) -> Vec<PostRecord> {
    posts
        .into_iter()
        .map(|mut post| {
            post.comments = comments.get(&post.id).cloned().unwrap_or_default();
            post.media_metadata = media.get(&post.id).cloned().unwrap_or_default();
            post
        })
        .collect()
}
