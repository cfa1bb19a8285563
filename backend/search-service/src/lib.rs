pub mod aggregator;
pub mod config;
pub mod elasticsearch;
pub mod error;
pub mod handlers;
pub mod models;
pub mod partition;
pub mod repository;

pub use aggregator::Aggregator;
pub use config::Config;
pub use self::elasticsearch::{ElasticsearchClient, SearchIndex, SearchScope};
pub use repository::{BulkFetcher, CommentStore, MediaStore};
