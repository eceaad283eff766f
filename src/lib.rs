// ドメイン層モジュール
pub mod domain;

// インフラ層モジュール
pub mod infrastructure;

// アプリケーション層モジュール
pub mod application;
