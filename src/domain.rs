// ドメイン層モジュール
pub mod admin_email;
pub mod instructor;
pub mod validation;

// 再エクスポート
pub use admin_email::AdminEmailAttributes;
pub use instructor::{InstructorAttributes, InstructorPrivileges};
pub use validation::FieldValidator;
