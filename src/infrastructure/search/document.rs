// 検索インデックスドキュメント構造
//
// 講師レコードを全文検索できるインデックス構造を定義する。
// ドキュメントIDには暗号化したストアキーを使用する。業務識別子
// （courseId、email）は同姓同名・メール再利用で衝突しうるため、
// 衝突しない識別子はストアキーだけである。

use serde::{Deserialize, Serialize};

use crate::domain::InstructorAttributes;
use crate::infrastructure::key_cipher::RegistrationKeyCipher;

/// ドキュメント構築エラー
#[derive(Debug, thiserror::Error)]
pub enum DocumentBuildError {
    /// ストアキーが未設定（保存前のレコードはインデックスできない）
    #[error("ストアキーが未設定のためインデックスできません")]
    MissingStoreKey,

    /// レコードのシリアライズに失敗
    #[error("レコードのシリアライズに失敗: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// 検索インデックスドキュメント
///
/// 検索対象のフィールドに加えて、完全なレコードJSON（attributes_json）を
/// 格納する。検索結果はattributes_jsonからレコードを復元して返すため、
/// インデックスとストアのスキーマを個別に進化させられる。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstructorSearchDocument {
    /// 暗号化済みストアキー。ドキュメントIDとしても使用
    pub id: String,

    /// コースID
    pub course_id: String,

    /// 講師名
    pub name: String,

    /// メールアドレス
    pub email: String,

    /// Googleアカウント識別子（未登録講師はなし）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_id: Option<String>,

    /// ロール
    pub role: String,

    /// 学生向け表示名
    pub displayed_name: String,

    /// 完全なレコードJSON（格納専用、検索対象外）
    pub attributes_json: String,
}

impl InstructorSearchDocument {
    /// 講師レコードからインデックスドキュメントを構築する
    ///
    /// ストアキーを暗号化してドキュメントIDにする。暗号化は決定的な
    /// ため、同じレコードの再インデックスは常に同じドキュメントを
    /// 上書きする。
    pub fn from_attributes(
        record: &InstructorAttributes,
        cipher: &dyn RegistrationKeyCipher,
    ) -> Result<Self, DocumentBuildError> {
        let store_key = record.key.as_ref().ok_or(DocumentBuildError::MissingStoreKey)?;

        let attributes_json = serde_json::to_string(record)?;

        Ok(Self {
            id: cipher.encrypt(store_key),
            course_id: record.course_id.clone(),
            name: record.name.clone(),
            email: record.email.clone(),
            google_id: record.google_id.clone(),
            role: record.role.clone(),
            displayed_name: record.displayed_name.clone(),
            attributes_json,
        })
    }

    /// ドキュメントIDを返す（暗号化済みストアキー）
    pub fn document_id(&self) -> &str {
        &self.id
    }

    /// 格納されたJSONから講師レコードを復元する
    pub fn to_attributes(&self) -> Result<InstructorAttributes, DocumentBuildError> {
        Ok(serde_json::from_str(&self.attributes_json)?)
    }
}

/// 検索結果のまとまり
///
/// ヒットした講師レコードと総ヒット件数を保持する。
#[derive(Debug, Clone, PartialEq)]
pub struct InstructorSearchResultBundle {
    /// ヒットした講師レコード
    pub instructors: Vec<InstructorAttributes>,
    /// 総ヒット件数
    pub total_hits: u64,
}

impl InstructorSearchResultBundle {
    /// 空の検索結果
    pub fn empty() -> Self {
        Self {
            instructors: Vec::new(),
            total_hits: 0,
        }
    }
}
