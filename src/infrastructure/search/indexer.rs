// 講師レコードのインデックス同期
//
// レコードストアの内容を検索インデックスへ反映する。ストアキーを
// 持たないレガシーレコードは、業務識別子（courseId、email）でストアを
// 引き直してキー付きの行を取得してからインデックスする。引き直しても
// 使えるレコードが得られない場合はそのレコードを黙ってスキップする。

use thiserror::Error;
use tracing::debug;

use super::backend::{SearchBackendError, SearchIndexBackend};
use super::document::{DocumentBuildError, InstructorSearchDocument, InstructorSearchResultBundle};
use crate::domain::InstructorAttributes;
use crate::infrastructure::instructor_store::{InstructorStore, StoreError};
use crate::infrastructure::key_cipher::RegistrationKeyCipher;

/// インデックス同期のエラー型
#[derive(Debug, Error)]
pub enum IndexerError {
    /// レコードストアの参照に失敗
    #[error("レコードストアの参照に失敗: {0}")]
    Store(#[from] StoreError),

    /// 検索バックエンドエラー
    #[error("検索バックエンドエラー: {0}")]
    Backend(#[from] SearchBackendError),

    /// ドキュメント構築に失敗
    #[error("ドキュメント構築に失敗: {0}")]
    Document(#[from] DocumentBuildError),
}

/// 講師レコードのインデクサー
///
/// レガシーレコードの引き直しを含むインデックス反映と、
/// 全文検索の入口を提供する。
#[derive(Debug, Clone)]
pub struct InstructorIndexer<S, B, C> {
    /// レコードストア（レガシーレコードの引き直しに使用）
    store: S,
    /// 検索インデックスバックエンド
    backend: B,
    /// ストアキーの暗号化
    cipher: C,
}

impl<S, B, C> InstructorIndexer<S, B, C>
where
    S: InstructorStore,
    B: SearchIndexBackend,
    C: RegistrationKeyCipher,
{
    /// 新しいInstructorIndexerを作成
    pub fn new(store: S, backend: B, cipher: C) -> Self {
        Self {
            store,
            backend,
            cipher,
        }
    }

    /// レコードをインデックスに反映
    ///
    /// ストアキーを持たないレコードは引き直してから反映する。
    /// 引き直しても使えるレコードが得られない場合は何もしない。
    pub async fn put_document(&self, record: &InstructorAttributes) -> Result<(), IndexerError> {
        let Some(document) = self.resolve_document(record).await? else {
            return Ok(());
        };

        self.backend.put(&document).await?;
        Ok(())
    }

    /// 複数レコードを1回のバルクリクエストでインデックスに反映
    ///
    /// 引き直しに失敗したレコードはスキップし、残りを反映する。
    pub async fn put_documents(
        &self,
        records: &[InstructorAttributes],
    ) -> Result<(), IndexerError> {
        let mut documents = Vec::with_capacity(records.len());
        for record in records {
            if let Some(document) = self.resolve_document(record).await? {
                documents.push(document);
            }
        }

        if documents.is_empty() {
            return Ok(());
        }

        self.backend.put_batch(&documents).await?;
        Ok(())
    }

    /// レコードに対応するドキュメントを削除
    ///
    /// ストアキーを持たないレコードは(courseId, email)でストアを引き直して
    /// キーを解決する。解決できなければ何もしない。
    pub async fn delete_document(
        &self,
        record: &InstructorAttributes,
    ) -> Result<(), IndexerError> {
        let store_key = match &record.key {
            Some(key) => key.clone(),
            None => {
                // レガシーレコード: キー付きの行を引き直す
                match self
                    .store
                    .get_by_email(&record.course_id, &record.email)
                    .await?
                {
                    Some(InstructorAttributes { key: Some(key), .. }) => key,
                    _ => {
                        debug!(
                            course_id = %record.course_id,
                            email = %record.email,
                            "キー付きレコードを解決できないためドキュメント削除をスキップ"
                        );
                        return Ok(());
                    }
                }
            }
        };

        let document_id = self.cipher.encrypt(&store_key);
        self.backend.delete(&document_id).await?;
        Ok(())
    }

    /// 全文検索を実行
    ///
    /// 空白のみのクエリはバックエンドに問い合わせず空の結果を返す。
    pub async fn search(
        &self,
        query_text: &str,
    ) -> Result<InstructorSearchResultBundle, IndexerError> {
        let query_text = query_text.trim();
        if query_text.is_empty() {
            return Ok(InstructorSearchResultBundle::empty());
        }

        Ok(self.backend.search(query_text).await?)
    }

    /// レコードからインデックス可能なドキュメントを作る
    ///
    /// ストアキーがなければ(courseId, email)でストアを引き直す。
    /// 解決できなければNoneを返す。
    async fn resolve_document(
        &self,
        record: &InstructorAttributes,
    ) -> Result<Option<InstructorSearchDocument>, IndexerError> {
        let resolved;
        let indexable = if record.key.is_some() {
            record
        } else {
            // レガシーレコード: キー付きの行を引き直す
            match self
                .store
                .get_by_email(&record.course_id, &record.email)
                .await?
            {
                Some(found) if found.key.is_some() => {
                    resolved = found;
                    &resolved
                }
                _ => {
                    debug!(
                        course_id = %record.course_id,
                        email = %record.email,
                        "キー付きレコードを解決できないためインデックスをスキップ"
                    );
                    return Ok(None);
                }
            }
        };

        let document = InstructorSearchDocument::from_attributes(indexable, &self.cipher)?;
        Ok(Some(document))
    }
}
