use crate::models::{HitKind, PostId, PostRecord, SearchHit, UserRecord};
use std::collections::HashSet;
use tracing::warn;

/// Search hits split by type
#[derive(Debug, Default, PartialEq)]
pub struct Partitioned {
    /// Distinct post ids in order of first appearance
    pub post_ids: Vec<PostId>,
    pub users: Vec<UserRecord>,
    pub posts: Vec<PostRecord>,
}

/// Split raw hits into users and posts, collecting the post ids to enrich.
///
/// Post hits without a usable `id` can never be enriched and are dropped.
/// Hits of any other type are ignored.
pub fn partition(hits: Vec<SearchHit>) -> Partitioned {
    let mut partitioned = Partitioned::default();
    let mut seen: HashSet<PostId> = HashSet::new();

    for hit in hits {
        match hit.kind {
            HitKind::Post => {
                let Some(id) = hit.source.get("id").and_then(PostId::from_json) else {
                    warn!(source = ?hit.source, "Dropping post hit without a usable id");
                    continue;
                };
                if seen.insert(id.clone()) {
                    partitioned.post_ids.push(id.clone());
                }
                partitioned.posts.push(PostRecord::new(id, hit.source));
            }
            HitKind::User => partitioned.users.push(UserRecord(hit.source)),
            HitKind::Other(_) => {}
        }
    }

    partitioned
}
