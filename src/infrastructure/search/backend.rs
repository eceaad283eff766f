// 検索インデックスバックエンド
//
// ドキュメントの登録・削除・全文検索をOpenSearchに対して実行する。
// トレイトで抽象化し、上位層はモックでテストできるようにする。

use async_trait::async_trait;
use opensearch::http::request::JsonBody;
use opensearch::{BulkParts, DeleteParts, IndexParts, SearchParts};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error};

use super::client::SearchClient;
use super::document::{InstructorSearchDocument, InstructorSearchResultBundle};
use crate::domain::InstructorAttributes;

/// 1回の検索で返す最大件数
const MAX_RESULTS: i64 = 100;

/// 検索バックエンドのエラー型
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SearchBackendError {
    /// リクエスト送信に失敗
    #[error("検索リクエストに失敗: {0}")]
    RequestFailed(String),

    /// インデックス操作がエラーステータスを返した
    #[error("インデックス操作に失敗 (status: {status}): {message}")]
    OperationFailed { status: u16, message: String },

    /// レスポンスの解析に失敗
    #[error("検索レスポンスの解析に失敗: {0}")]
    ResponseParseError(String),
}

/// 検索インデックスバックエンドのトレイト
///
/// 異なる実装を可能にします（実際のOpenSearch、テスト用モック）。
#[async_trait]
pub trait SearchIndexBackend: Send + Sync {
    /// ドキュメントを登録または上書き
    async fn put(&self, document: &InstructorSearchDocument) -> Result<(), SearchBackendError>;

    /// 複数ドキュメントを1回のバルクリクエストで登録
    async fn put_batch(
        &self,
        documents: &[InstructorSearchDocument],
    ) -> Result<(), SearchBackendError>;

    /// ドキュメントIDで削除。存在しないIDは成功として扱う
    async fn delete(&self, document_id: &str) -> Result<(), SearchBackendError>;

    /// 全文検索を実行
    async fn search(
        &self,
        query_text: &str,
    ) -> Result<InstructorSearchResultBundle, SearchBackendError>;
}

/// SearchIndexBackendのOpenSearch実装
#[derive(Debug, Clone)]
pub struct OpenSearchIndexBackend {
    /// 検索クライアント
    client: SearchClient,
}

impl OpenSearchIndexBackend {
    /// 新しいOpenSearchIndexBackendを作成
    pub fn new(client: SearchClient) -> Self {
        Self { client }
    }

    /// 検索クエリボディを構築
    ///
    /// 名前を優先しつつ複数フィールドを横断検索する。
    /// _sourceはattributes_jsonのみ取得する。
    fn build_query_body(query_text: &str) -> Value {
        json!({
            "query": {
                "multi_match": {
                    "query": query_text,
                    "fields": [
                        "name^2",
                        "email",
                        "displayed_name",
                        "course_id",
                        "google_id",
                        "role"
                    ]
                }
            },
            "size": MAX_RESULTS,
            "_source": ["attributes_json"]
        })
    }

    /// 検索レスポンスから講師レコードを抽出
    fn extract_bundle_from_response(
        response: Value,
    ) -> Result<InstructorSearchResultBundle, SearchBackendError> {
        let hits = response
            .get("hits")
            .and_then(|h| h.get("hits"))
            .and_then(|h| h.as_array())
            .ok_or_else(|| {
                SearchBackendError::ResponseParseError(
                    "レスポンスにhitsフィールドがありません".to_string(),
                )
            })?;

        let total_hits = response
            .get("hits")
            .and_then(|h| h.get("total"))
            .and_then(|t| t.get("value"))
            .and_then(|v| v.as_u64())
            .unwrap_or(hits.len() as u64);

        let mut instructors = Vec::with_capacity(hits.len());

        for hit in hits {
            let attributes_json = hit
                .get("_source")
                .and_then(|s| s.get("attributes_json"))
                .and_then(|a| a.as_str())
                .ok_or_else(|| {
                    SearchBackendError::ResponseParseError(
                        "attributes_jsonフィールドがありません".to_string(),
                    )
                })?;

            let record: InstructorAttributes =
                serde_json::from_str(attributes_json).map_err(|e| {
                    error!(error = %e, "講師レコードのデシリアライズに失敗");
                    SearchBackendError::ResponseParseError(format!(
                        "講師レコードのデシリアライズに失敗: {}",
                        e
                    ))
                })?;

            instructors.push(record);
        }

        Ok(InstructorSearchResultBundle {
            instructors,
            total_hits,
        })
    }
}

#[async_trait]
impl SearchIndexBackend for OpenSearchIndexBackend {
    async fn put(&self, document: &InstructorSearchDocument) -> Result<(), SearchBackendError> {
        let response = self
            .client
            .client()
            .index(IndexParts::IndexId(
                self.client.index_name(),
                document.document_id(),
            ))
            .body(json!(document))
            .send()
            .await
            .map_err(|e| SearchBackendError::RequestFailed(e.to_string()))?;

        let status = response.status_code().as_u16();
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchBackendError::OperationFailed {
                status,
                message: body,
            });
        }

        debug!(
            document_id = document.document_id(),
            course_id = %document.course_id,
            "ドキュメントをインデックス化"
        );

        Ok(())
    }

    async fn put_batch(
        &self,
        documents: &[InstructorSearchDocument],
    ) -> Result<(), SearchBackendError> {
        if documents.is_empty() {
            return Ok(());
        }

        let mut body: Vec<JsonBody<_>> = Vec::with_capacity(documents.len() * 2);
        for document in documents {
            // バルクAPIのアクション行
            body.push(
                json!({
                    "index": {
                        "_index": self.client.index_name(),
                        "_id": document.document_id()
                    }
                })
                .into(),
            );
            // ドキュメント行
            body.push(json!(document).into());
        }

        let response = self
            .client
            .client()
            .bulk(BulkParts::None)
            .body(body)
            .send()
            .await
            .map_err(|e| SearchBackendError::RequestFailed(e.to_string()))?;

        let status = response.status_code().as_u16();
        if status >= 400 {
            let body_text = response.text().await.unwrap_or_default();
            return Err(SearchBackendError::OperationFailed {
                status,
                message: body_text,
            });
        }

        // レスポンスを解析して個別エラーを検出
        let response_body = response.json::<Value>().await.map_err(|e| {
            SearchBackendError::ResponseParseError(format!("レスポンスの解析に失敗: {}", e))
        })?;

        let mut error_count = 0usize;
        if let Some(items) = response_body.get("items").and_then(|v| v.as_array()) {
            for item in items {
                if let Some(index_result) = item.get("index") {
                    if let Some(item_error) = index_result.get("error") {
                        error!(error = %item_error, "バルクインデックスでエラー発生");
                        error_count += 1;
                    }
                }
            }
        }

        if error_count > 0 {
            return Err(SearchBackendError::OperationFailed {
                status,
                message: format!("{}件のドキュメントでエラーが発生", error_count),
            });
        }

        debug!(count = documents.len(), "ドキュメントを一括インデックス化");

        Ok(())
    }

    async fn delete(&self, document_id: &str) -> Result<(), SearchBackendError> {
        let response = self
            .client
            .client()
            .delete(DeleteParts::IndexId(self.client.index_name(), document_id))
            .send()
            .await
            .map_err(|e| SearchBackendError::RequestFailed(e.to_string()))?;

        let status = response.status_code().as_u16();
        // 404はドキュメントが存在しない場合（既に削除済み）なので成功として扱う
        if status >= 400 && status != 404 {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchBackendError::OperationFailed {
                status,
                message: body,
            });
        }

        debug!(document_id = document_id, "ドキュメントを削除");

        Ok(())
    }

    async fn search(
        &self,
        query_text: &str,
    ) -> Result<InstructorSearchResultBundle, SearchBackendError> {
        let body = Self::build_query_body(query_text);

        let response = self
            .client
            .client()
            .search(SearchParts::Index(&[self.client.index_name()]))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchBackendError::RequestFailed(e.to_string()))?;

        let status = response.status_code().as_u16();
        if status >= 400 {
            let body_text = response.text().await.unwrap_or_default();
            return Err(SearchBackendError::OperationFailed {
                status,
                message: body_text,
            });
        }

        let response_body = response.json::<Value>().await.map_err(|e| {
            SearchBackendError::ResponseParseError(format!("レスポンスの解析に失敗: {}", e))
        })?;

        Self::extract_bundle_from_response(response_body)
    }
}
