// アプリケーション層モジュール
//
// レコードストアと検索インデックスの変更を操作単位で順序付ける
// オーケストレーション層。ストアが常に信頼できる情報源であり、
// インデックスへの反映はベストエフォートで行う。
pub mod admin_emails_db;
pub mod instructors_db;

// 再エクスポート
pub use admin_emails_db::{AdminEmailsDb, AdminEmailsDbError};
pub use instructors_db::{InstructorsDb, InstructorsDbError};
