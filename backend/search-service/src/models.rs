use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgTypeInfo, PgValueRef, Postgres};

/// Timestamps are rendered exactly as stored, without re-zoning.
const STORAGE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Canonical post identifier, shared by search hits and both stores.
///
/// Integer ids and integer-looking strings (`7`, `"7"`, `" 7 "`) collapse to
/// `Int`; any other non-empty string (UUIDs, slugs) is kept trimmed as `Str`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum PostId {
    Int(i64),
    Str(String),
}

impl PostId {
    /// Accepts JSON integers and strings; anything else has no usable id.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(PostId::Int),
            Value::String(s) => Self::from_text(s),
            _ => None,
        }
    }

    pub fn from_text(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        Some(match text.parse() {
            Ok(n) => PostId::Int(n),
            Err(_) => PostId::Str(text.to_string()),
        })
    }
}

impl std::fmt::Display for PostId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PostId::Int(n) => write!(f, "{n}"),
            PostId::Str(s) => f.write_str(s),
        }
    }
}

/// Stores hand `post_id` back as text (`post_id::text`), whatever the
/// column type, so integer and uuid keys decode the same way.
impl sqlx::Type<Postgres> for PostId {
    fn type_info() -> PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> sqlx::Decode<'r, Postgres> for PostId {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let text = <&'r str as sqlx::Decode<'r, Postgres>>::decode(value)?;
        PostId::from_text(text).ok_or_else(|| "empty post_id".into())
    }
}

/// Source type of a search hit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitKind {
    User,
    Post,
    Other(String),
}

impl HitKind {
    pub const POSTS_TAG: &'static str = "posts";
    pub const USERS_TAG: &'static str = "users";

    pub fn from_tag(tag: &str) -> Self {
        match tag {
            Self::POSTS_TAG => HitKind::Post,
            Self::USERS_TAG => HitKind::User,
            other => HitKind::Other(other.to_string()),
        }
    }
}

/// One record returned by the search index
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub kind: HitKind,
    pub source: Map<String, Value>,
}

impl SearchHit {
    pub fn new(kind: HitKind, source: Map<String, Value>) -> Self {
        Self { kind, source }
    }
}

/// Row types fetched in bulk by post id
pub trait ForeignKeyed {
    fn post_id(&self) -> &PostId;
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub post_id: PostId,
    pub user_id: i64,
    pub username: String,
    pub content: String,
    #[serde(serialize_with = "serialize_storage_timestamp")]
    pub created_at: NaiveDateTime,
}

impl ForeignKeyed for Comment {
    fn post_id(&self) -> &PostId {
        &self.post_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct MediaItem {
    pub post_id: PostId,
    pub s3_key: String,
    pub user_id: i64,
    pub url: String,
    /// Byte count; negative values in the store fail to decode.
    #[sqlx(try_from = "i64")]
    pub size: u64,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub media_type: String,
}

impl ForeignKeyed for MediaItem {
    fn post_id(&self) -> &PostId {
        &self.post_id
    }
}

/// User hit attributes, passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct UserRecord(pub Map<String, Value>);

/// Post hit attributes plus the enrichment attached during aggregation.
///
/// `comments` and `media_metadata` always serialize as arrays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRecord {
    #[serde(skip)]
    pub id: PostId,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
    pub comments: Vec<Comment>,
    pub media_metadata: Vec<MediaItem>,
}

impl PostRecord {
    pub fn new(id: PostId, mut attributes: Map<String, Value>) -> Self {
        // enrichment keys are owned by the aggregator
        attributes.remove("comments");
        attributes.remove("media_metadata");

        Self {
            id,
            attributes,
            comments: Vec::new(),
            media_metadata: Vec::new(),
        }
    }
}

/// The `{users, posts}` payload returned for one query
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregationResult {
    pub users: Vec<UserRecord>,
    pub posts: Vec<PostRecord>,
}

fn serialize_storage_timestamp<S>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(&ts.format(STORAGE_TIMESTAMP_FORMAT))
}
