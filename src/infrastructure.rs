// インフラ層モジュール
pub mod admin_email_store;
pub mod config;
pub mod instructor_store;
pub mod key_cipher;
pub mod logging;
pub mod search;

// 再エクスポート
pub use admin_email_store::{AdminEmailStore, DynamoAdminEmailStore};
pub use config::{DynamoDbConfig, DynamoDbConfigError};
pub use instructor_store::{DynamoInstructorStore, InstructorStore, StoreError};
pub use key_cipher::{AesRegistrationKeyCipher, KeyCipherError, RegistrationKeyCipher};
pub use logging::init_logging;
pub use search::{
    InstructorIndexer, InstructorSearchDocument, InstructorSearchResultBundle, IndexerError,
    OpenSearchIndexBackend, SearchBackendError, SearchClient, SearchConfig, SearchIndexBackend,
};
