// 検索インデックス層モジュール
//
// OpenSearchを使った講師レコードの全文検索を提供する。
// インデックスはプライマリストアの派生データであり、
// ストアが常に信頼できる情報源となる。
pub mod backend;
pub mod client;
pub mod config;
pub mod document;
pub mod indexer;

// 再エクスポート
pub use backend::{OpenSearchIndexBackend, SearchBackendError, SearchIndexBackend};
pub use client::{SearchClient, SearchClientError};
pub use config::{SearchConfig, SearchConfigError};
pub use document::{DocumentBuildError, InstructorSearchDocument, InstructorSearchResultBundle};
pub use indexer::{IndexerError, InstructorIndexer};
