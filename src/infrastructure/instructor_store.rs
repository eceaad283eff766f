// DynamoDBで講師レコードを管理するためのレコードストアアダプター
//
// (courseId, email) / (courseId, googleId) / 登録キーによるポイント参照と、
// コース・googleId・メール単位のフィルタースキャンを提供する。
// 参照のミスはエラーではなく「不在」（None / 空Vec）として返す。

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, DeleteRequest, PutRequest, Select, WriteRequest};
use aws_sdk_dynamodb::Client as DynamoDbClient;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::{InstructorAttributes, InstructorPrivileges};

/// DynamoDBのBatchWriteItemが1回に受け付ける最大リクエスト数
const BATCH_WRITE_LIMIT: usize = 25;

/// レコードストア操作のエラー型
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    /// ストアへの書き込みに失敗
    #[error("Write error: {0}")]
    WriteError(String),

    /// ストアからの読み取りに失敗
    #[error("Read error: {0}")]
    ReadError(String),

    /// データのシリアライズ/デシリアライズに失敗
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// 講師レコードの永続化用トレイト
///
/// 異なる実装を可能にします（実際のDynamoDB、テスト用モック）。
/// すべての参照系はミスを`Ok(None)`または空Vecとして返す。
#[async_trait]
pub trait InstructorStore: Send + Sync {
    /// (courseId, email) でポイント参照
    async fn get_by_email(
        &self,
        course_id: &str,
        email: &str,
    ) -> Result<Option<InstructorAttributes>, StoreError>;

    /// (courseId, googleId) でポイント参照
    async fn get_by_google_id(
        &self,
        course_id: &str,
        google_id: &str,
    ) -> Result<Option<InstructorAttributes>, StoreError>;

    /// 登録キー（平文）でポイント参照
    async fn get_by_registration_key(
        &self,
        registration_key: &str,
    ) -> Result<Option<InstructorAttributes>, StoreError>;

    /// コース内の全講師
    async fn list_for_course(
        &self,
        course_id: &str,
    ) -> Result<Vec<InstructorAttributes>, StoreError>;

    /// 複数コースの全講師
    async fn list_for_courses(
        &self,
        course_ids: &[String],
    ) -> Result<Vec<InstructorAttributes>, StoreError>;

    /// googleIdに紐づく全講師。omit_archivedでアーカイブ済みを除外
    async fn list_for_google_id(
        &self,
        google_id: &str,
        omit_archived: bool,
    ) -> Result<Vec<InstructorAttributes>, StoreError>;

    /// メールアドレスに紐づく全講師
    async fn list_for_email(&self, email: &str)
        -> Result<Vec<InstructorAttributes>, StoreError>;

    /// 全講師のフルスキャン
    ///
    /// スケールしないため管理者機能以外では使用しないこと。
    async fn list_all(&self) -> Result<Vec<InstructorAttributes>, StoreError>;

    /// (courseId, email) のレコードが存在するか
    async fn exists(&self, course_id: &str, email: &str) -> Result<bool, StoreError>;

    /// 新規レコードを挿入し、ストアキーと登録キーを採番して返す
    async fn insert(
        &self,
        record: InstructorAttributes,
    ) -> Result<InstructorAttributes, StoreError>;

    /// 複数レコードを1回のグループ書き込みで挿入
    async fn insert_batch(
        &self,
        records: Vec<InstructorAttributes>,
    ) -> Result<Vec<InstructorAttributes>, StoreError>;

    /// ストアキーで既存レコードを上書き
    async fn update(&self, record: &InstructorAttributes) -> Result<(), StoreError>;

    /// レコードを削除（ストアキー未設定なら何もしない）
    async fn delete(&self, record: &InstructorAttributes) -> Result<(), StoreError>;

    /// 複数レコードを1回のグループ削除で削除
    async fn delete_batch(&self, records: &[InstructorAttributes]) -> Result<(), StoreError>;
}

/// InstructorStoreのDynamoDB実装
///
/// パーティションキーは`record_id`（ストアキー）。業務識別子による参照は
/// フィルター式付きスキャンで行う。
#[derive(Debug, Clone)]
pub struct DynamoInstructorStore {
    /// DynamoDBクライアント
    client: DynamoDbClient,
    /// 講師テーブル名
    table_name: String,
}

impl DynamoInstructorStore {
    /// 新しいDynamoInstructorStoreを作成
    pub fn new(client: DynamoDbClient, table_name: String) -> Self {
        Self { client, table_name }
    }

    /// 登録キーを生成
    ///
    /// 業務識別子と乱数を組み合わせた不透明トークン。
    fn generate_registration_key(course_id: &str, email: &str) -> String {
        format!("{}%{}%{}", course_id, email, Uuid::new_v4().simple())
    }

    /// レコードをDynamoDBの属性マップへ変換
    ///
    /// ストアキーが未設定のレコードは書き込めない。
    fn build_item(
        record: &InstructorAttributes,
    ) -> Result<HashMap<String, AttributeValue>, StoreError> {
        let record_id = record
            .key
            .as_ref()
            .ok_or_else(|| StoreError::WriteError("store key is not set".to_string()))?;

        let privileges_text = record
            .privileges
            .as_text()
            .map_err(|e| StoreError::SerializationError(e.to_string()))?;

        let mut item = HashMap::new();
        item.insert("record_id".to_string(), AttributeValue::S(record_id.clone()));
        item.insert(
            "course_id".to_string(),
            AttributeValue::S(record.course_id.clone()),
        );
        item.insert("name".to_string(), AttributeValue::S(record.name.clone()));
        item.insert("email".to_string(), AttributeValue::S(record.email.clone()));
        item.insert("role".to_string(), AttributeValue::S(record.role.clone()));
        item.insert(
            "is_archived".to_string(),
            AttributeValue::Bool(record.is_archived),
        );
        item.insert(
            "is_displayed_to_students".to_string(),
            AttributeValue::Bool(record.is_displayed_to_students),
        );
        item.insert(
            "displayed_name".to_string(),
            AttributeValue::S(record.displayed_name.clone()),
        );
        item.insert("privileges".to_string(), AttributeValue::S(privileges_text));

        if let Some(google_id) = &record.google_id {
            item.insert("google_id".to_string(), AttributeValue::S(google_id.clone()));
        }
        if let Some(registration_key) = &record.registration_key {
            item.insert(
                "registration_key".to_string(),
                AttributeValue::S(registration_key.clone()),
            );
        }

        Ok(item)
    }

    /// DynamoDBの属性マップからレコードを復元
    fn record_from_item(
        item: &HashMap<String, AttributeValue>,
    ) -> Result<InstructorAttributes, StoreError> {
        fn required(
            item: &HashMap<String, AttributeValue>,
            field: &str,
        ) -> Result<String, StoreError> {
            item.get(field)
                .and_then(|v| v.as_s().ok())
                .cloned()
                .ok_or_else(|| {
                    StoreError::SerializationError(format!("missing field: {}", field))
                })
        }

        fn optional(item: &HashMap<String, AttributeValue>, field: &str) -> Option<String> {
            item.get(field).and_then(|v| v.as_s().ok()).cloned()
        }

        fn flag(item: &HashMap<String, AttributeValue>, field: &str) -> bool {
            item.get(field)
                .and_then(|v| v.as_bool().ok())
                .copied()
                .unwrap_or(false)
        }

        let privileges = match optional(item, "privileges") {
            Some(text) => InstructorPrivileges::from_text(&text)
                .map_err(|e| StoreError::SerializationError(e.to_string()))?,
            // キー導入以前のレガシー行は権限テキストを持たないことがある
            None => InstructorPrivileges::default(),
        };

        Ok(InstructorAttributes {
            course_id: required(item, "course_id")?,
            name: required(item, "name")?,
            email: required(item, "email")?,
            google_id: optional(item, "google_id"),
            role: required(item, "role")?,
            is_archived: flag(item, "is_archived"),
            is_displayed_to_students: flag(item, "is_displayed_to_students"),
            displayed_name: required(item, "displayed_name")?,
            privileges,
            registration_key: optional(item, "registration_key"),
            key: optional(item, "record_id"),
        })
    }

    /// フィルター式付きスキャン（ページネーション対応）
    async fn scan_records(
        &self,
        filter: Option<(String, Vec<(String, AttributeValue)>)>,
    ) -> Result<Vec<InstructorAttributes>, StoreError> {
        let mut records = Vec::new();
        let mut last_evaluated_key = None;

        // LastEvaluatedKeyがある限りスキャンを続ける
        loop {
            let mut builder = self.client.scan().table_name(&self.table_name);

            if let Some((expression, values)) = &filter {
                builder = builder.filter_expression(expression);
                for (name, value) in values {
                    builder = builder.expression_attribute_values(name, value.clone());
                }
            }

            if let Some(key) = last_evaluated_key.take() {
                builder = builder.set_exclusive_start_key(Some(key));
            }

            let result = builder
                .send()
                .await
                .map_err(|e| StoreError::ReadError(e.into_service_error().to_string()))?;

            if let Some(items) = result.items {
                for item in &items {
                    records.push(Self::record_from_item(item)?);
                }
            }

            match result.last_evaluated_key {
                Some(key) => last_evaluated_key = Some(key),
                None => break,
            }
        }

        Ok(records)
    }

    /// スキャンして最初の1件を返す
    async fn scan_first(
        &self,
        expression: String,
        values: Vec<(String, AttributeValue)>,
    ) -> Result<Option<InstructorAttributes>, StoreError> {
        let records = self.scan_records(Some((expression, values))).await?;
        Ok(records.into_iter().next())
    }

    /// WriteRequestの列をBatchWriteItemの上限単位に分割
    fn batch_chunks(requests: &[WriteRequest]) -> std::slice::Chunks<'_, WriteRequest> {
        requests.chunks(BATCH_WRITE_LIMIT)
    }

    /// WriteRequestの列をBatchWriteItemの上限単位で送信
    async fn send_batch_writes(&self, requests: Vec<WriteRequest>) -> Result<(), StoreError> {
        for chunk in Self::batch_chunks(&requests) {
            let result = self
                .client
                .batch_write_item()
                .request_items(&self.table_name, chunk.to_vec())
                .send()
                .await
                .map_err(|e| StoreError::WriteError(e.into_service_error().to_string()))?;

            if let Some(unprocessed) = result.unprocessed_items {
                let count: usize = unprocessed.values().map(|v| v.len()).sum();
                if count > 0 {
                    warn!(unprocessed_count = count, "BatchWriteItemに未処理の項目が残った");
                }
            }
        }
        Ok(())
    }

    /// 挿入前にストアキーと登録キーを採番
    fn assign_keys(mut record: InstructorAttributes) -> InstructorAttributes {
        record.key = Some(Uuid::new_v4().to_string());
        if record.registration_key.is_none() {
            record.registration_key = Some(Self::generate_registration_key(
                &record.course_id,
                &record.email,
            ));
        }
        record
    }
}

#[async_trait]
impl InstructorStore for DynamoInstructorStore {
    async fn get_by_email(
        &self,
        course_id: &str,
        email: &str,
    ) -> Result<Option<InstructorAttributes>, StoreError> {
        self.scan_first(
            "course_id = :c AND email = :e".to_string(),
            vec![
                (":c".to_string(), AttributeValue::S(course_id.to_string())),
                (":e".to_string(), AttributeValue::S(email.to_string())),
            ],
        )
        .await
    }

    async fn get_by_google_id(
        &self,
        course_id: &str,
        google_id: &str,
    ) -> Result<Option<InstructorAttributes>, StoreError> {
        self.scan_first(
            "course_id = :c AND google_id = :g".to_string(),
            vec![
                (":c".to_string(), AttributeValue::S(course_id.to_string())),
                (":g".to_string(), AttributeValue::S(google_id.to_string())),
            ],
        )
        .await
    }

    async fn get_by_registration_key(
        &self,
        registration_key: &str,
    ) -> Result<Option<InstructorAttributes>, StoreError> {
        self.scan_first(
            "registration_key = :k".to_string(),
            vec![(
                ":k".to_string(),
                AttributeValue::S(registration_key.to_string()),
            )],
        )
        .await
    }

    async fn list_for_course(
        &self,
        course_id: &str,
    ) -> Result<Vec<InstructorAttributes>, StoreError> {
        self.scan_records(Some((
            "course_id = :c".to_string(),
            vec![(":c".to_string(), AttributeValue::S(course_id.to_string()))],
        )))
        .await
    }

    async fn list_for_courses(
        &self,
        course_ids: &[String],
    ) -> Result<Vec<InstructorAttributes>, StoreError> {
        if course_ids.is_empty() {
            return Ok(Vec::new());
        }

        // course_id IN (:c0, :c1, ...) を動的に構築
        let mut placeholders = Vec::with_capacity(course_ids.len());
        let mut values = Vec::with_capacity(course_ids.len());
        for (i, course_id) in course_ids.iter().enumerate() {
            let placeholder = format!(":c{}", i);
            values.push((placeholder.clone(), AttributeValue::S(course_id.clone())));
            placeholders.push(placeholder);
        }
        let expression = format!("course_id IN ({})", placeholders.join(", "));

        self.scan_records(Some((expression, values))).await
    }

    async fn list_for_google_id(
        &self,
        google_id: &str,
        omit_archived: bool,
    ) -> Result<Vec<InstructorAttributes>, StoreError> {
        let filter = if omit_archived {
            (
                "google_id = :g AND is_archived <> :t".to_string(),
                vec![
                    (":g".to_string(), AttributeValue::S(google_id.to_string())),
                    (":t".to_string(), AttributeValue::Bool(true)),
                ],
            )
        } else {
            (
                "google_id = :g".to_string(),
                vec![(":g".to_string(), AttributeValue::S(google_id.to_string()))],
            )
        };

        self.scan_records(Some(filter)).await
    }

    async fn list_for_email(
        &self,
        email: &str,
    ) -> Result<Vec<InstructorAttributes>, StoreError> {
        self.scan_records(Some((
            "email = :e".to_string(),
            vec![(":e".to_string(), AttributeValue::S(email.to_string()))],
        )))
        .await
    }

    async fn list_all(&self) -> Result<Vec<InstructorAttributes>, StoreError> {
        self.scan_records(None).await
    }

    async fn exists(&self, course_id: &str, email: &str) -> Result<bool, StoreError> {
        // 件数のみ取得する軽量な存在チェック
        let result = self
            .client
            .scan()
            .table_name(&self.table_name)
            .select(Select::Count)
            .filter_expression("course_id = :c AND email = :e")
            .expression_attribute_values(":c", AttributeValue::S(course_id.to_string()))
            .expression_attribute_values(":e", AttributeValue::S(email.to_string()))
            .send()
            .await
            .map_err(|e| StoreError::ReadError(e.into_service_error().to_string()))?;

        Ok(result.count > 0)
    }

    async fn insert(
        &self,
        record: InstructorAttributes,
    ) -> Result<InstructorAttributes, StoreError> {
        let record = Self::assign_keys(record);
        let item = Self::build_item(&record)?;

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(record_id)")
            .send()
            .await
            .map_err(|e| StoreError::WriteError(e.into_service_error().to_string()))?;

        debug!(
            course_id = %record.course_id,
            email = %record.email,
            "講師レコードを挿入"
        );

        Ok(record)
    }

    async fn insert_batch(
        &self,
        records: Vec<InstructorAttributes>,
    ) -> Result<Vec<InstructorAttributes>, StoreError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let records: Vec<InstructorAttributes> =
            records.into_iter().map(Self::assign_keys).collect();

        let mut requests = Vec::with_capacity(records.len());
        for record in &records {
            let item = Self::build_item(record)?;
            let put = PutRequest::builder()
                .set_item(Some(item))
                .build()
                .map_err(|e| StoreError::WriteError(e.to_string()))?;
            requests.push(WriteRequest::builder().put_request(put).build());
        }

        self.send_batch_writes(requests).await?;

        debug!(count = records.len(), "講師レコードを一括挿入");

        Ok(records)
    }

    async fn update(&self, record: &InstructorAttributes) -> Result<(), StoreError> {
        let item = Self::build_item(record)?;

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| StoreError::WriteError(e.into_service_error().to_string()))?;

        Ok(())
    }

    async fn delete(&self, record: &InstructorAttributes) -> Result<(), StoreError> {
        let Some(record_id) = &record.key else {
            // ストアキーのないレコードは特定できないため削除対象にしない
            debug!(
                course_id = %record.course_id,
                email = %record.email,
                "ストアキー未設定のため削除をスキップ"
            );
            return Ok(());
        };

        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key("record_id", AttributeValue::S(record_id.clone()))
            .send()
            .await
            .map_err(|e| StoreError::WriteError(e.into_service_error().to_string()))?;

        Ok(())
    }

    async fn delete_batch(&self, records: &[InstructorAttributes]) -> Result<(), StoreError> {
        let mut requests = Vec::new();
        for record in records {
            let Some(record_id) = &record.key else {
                continue;
            };
            let delete = DeleteRequest::builder()
                .key("record_id", AttributeValue::S(record_id.clone()))
                .build()
                .map_err(|e| StoreError::WriteError(e.to_string()))?;
            requests.push(WriteRequest::builder().delete_request(delete).build());
        }

        if requests.is_empty() {
            return Ok(());
        }

        self.send_batch_writes(requests).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    // ==================== 属性マップ変換のテスト ====================

    fn sample_record() -> InstructorAttributes {
        let mut record = InstructorAttributes::new("CS101", "Alice", "alice@example.com");
        record.google_id = Some("alice.g".to_string());
        record.key = Some("record-0001".to_string());
        record.registration_key = Some("CS101%alice@example.com%tok".to_string());
        record
    }

    #[test]
    fn test_build_item_roundtrip() {
        let record = sample_record();

        let item = DynamoInstructorStore::build_item(&record).expect("変換に失敗");
        let restored = DynamoInstructorStore::record_from_item(&item).expect("復元に失敗");

        assert_eq!(record, restored);
    }

    #[test]
    fn test_build_item_without_store_key() {
        let mut record = sample_record();
        record.key = None;

        let result = DynamoInstructorStore::build_item(&record);
        assert!(matches!(result, Err(StoreError::WriteError(_))));
    }

    #[test]
    fn test_build_item_omits_absent_google_id() {
        let mut record = sample_record();
        record.google_id = None;

        let item = DynamoInstructorStore::build_item(&record).expect("変換に失敗");
        assert!(!item.contains_key("google_id"));

        let restored = DynamoInstructorStore::record_from_item(&item).expect("復元に失敗");
        assert!(restored.google_id.is_none());
    }

    #[test]
    fn test_record_from_item_missing_required_field() {
        let record = sample_record();
        let mut item = DynamoInstructorStore::build_item(&record).expect("変換に失敗");
        item.remove("course_id");

        let result = DynamoInstructorStore::record_from_item(&item);
        assert!(matches!(result, Err(StoreError::SerializationError(_))));
    }

    #[test]
    fn test_record_from_item_legacy_without_privileges() {
        // 権限テキストを持たないレガシー行はデフォルト権限で復元される
        let record = sample_record();
        let mut item = DynamoInstructorStore::build_item(&record).expect("変換に失敗");
        item.remove("privileges");

        let restored = DynamoInstructorStore::record_from_item(&item).expect("復元に失敗");
        assert_eq!(restored.privileges, InstructorPrivileges::default());
    }

    #[test]
    fn test_generate_registration_key_is_opaque_and_unique() {
        let key1 =
            DynamoInstructorStore::generate_registration_key("CS101", "alice@example.com");
        let key2 =
            DynamoInstructorStore::generate_registration_key("CS101", "alice@example.com");

        assert_ne!(key1, key2);
        assert!(key1.starts_with("CS101%alice@example.com%"));
    }

    #[test]
    fn test_store_error_display() {
        assert_eq!(
            StoreError::WriteError("conditional check failed".to_string()).to_string(),
            "Write error: conditional check failed"
        );
        assert_eq!(
            StoreError::ReadError("item not found".to_string()).to_string(),
            "Read error: item not found"
        );
        assert_eq!(
            StoreError::SerializationError("invalid format".to_string()).to_string(),
            "Serialization error: invalid format"
        );
    }

    // ==================== グループ書き込みの分割テスト ====================

    fn delete_requests(count: usize) -> Vec<WriteRequest> {
        (0..count)
            .map(|i| {
                let delete = DeleteRequest::builder()
                    .key(
                        "record_id".to_string(),
                        AttributeValue::S(format!("record-{:04}", i)),
                    )
                    .build()
                    .expect("DeleteRequestの構築に失敗");
                WriteRequest::builder().delete_request(delete).build()
            })
            .collect()
    }

    #[test]
    fn test_batch_chunks_splits_above_limit() {
        let requests = delete_requests(BATCH_WRITE_LIMIT + 1);

        let chunks: Vec<&[WriteRequest]> =
            DynamoInstructorStore::batch_chunks(&requests).collect();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), BATCH_WRITE_LIMIT);
        assert_eq!(chunks[1].len(), 1);
    }

    #[test]
    fn test_batch_chunks_single_call_at_exact_limit() {
        let requests = delete_requests(BATCH_WRITE_LIMIT);

        let chunks: Vec<&[WriteRequest]> =
            DynamoInstructorStore::batch_chunks(&requests).collect();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), BATCH_WRITE_LIMIT);
    }

    #[test]
    fn test_batch_chunks_preserves_every_request() {
        let requests = delete_requests(BATCH_WRITE_LIMIT * 2 + 3);

        let total: usize = DynamoInstructorStore::batch_chunks(&requests)
            .map(|chunk| chunk.len())
            .sum();

        assert_eq!(total, BATCH_WRITE_LIMIT * 2 + 3);
    }

    // ==================== モックレコードストア ====================

    /// ユニットテスト用のモックInstructorStore
    #[derive(Debug, Clone)]
    pub(crate) struct MockInstructorStore {
        /// 保存されたレコード: record_id -> InstructorAttributes
        records: Arc<Mutex<HashMap<String, InstructorAttributes>>>,
        /// 次の操作で返すエラー（エラーパスのテスト用）
        next_error: Arc<Mutex<Option<StoreError>>>,
        /// 削除直後に再出現させるレコード（削除と再作成の競合を再現）
        recreate_on_delete: Arc<Mutex<Option<InstructorAttributes>>>,
        /// list_for_coursesには現れるがポイント参照では見つからないレコード
        /// （存在判定と読み取りの矛盾を再現）
        phantom_records: Arc<Mutex<Vec<InstructorAttributes>>>,
    }

    impl MockInstructorStore {
        pub(crate) fn new() -> Self {
            Self {
                records: Arc::new(Mutex::new(HashMap::new())),
                next_error: Arc::new(Mutex::new(None)),
                recreate_on_delete: Arc::new(Mutex::new(None)),
                phantom_records: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub(crate) fn set_next_error(&self, error: StoreError) {
            *self.next_error.lock().unwrap() = Some(error);
        }

        pub(crate) fn set_recreate_on_delete(&self, record: InstructorAttributes) {
            *self.recreate_on_delete.lock().unwrap() = Some(record);
        }

        pub(crate) fn add_phantom_record(&self, record: InstructorAttributes) {
            self.phantom_records.lock().unwrap().push(record);
        }

        pub(crate) fn record_count(&self) -> usize {
            self.records.lock().unwrap().len()
        }

        fn take_error(&self) -> Option<StoreError> {
            self.next_error.lock().unwrap().take()
        }

        fn find_by_email(&self, course_id: &str, email: &str) -> Option<InstructorAttributes> {
            self.records
                .lock()
                .unwrap()
                .values()
                .find(|r| r.course_id == course_id && r.email == email)
                .cloned()
        }
    }

    #[async_trait]
    impl InstructorStore for MockInstructorStore {
        async fn get_by_email(
            &self,
            course_id: &str,
            email: &str,
        ) -> Result<Option<InstructorAttributes>, StoreError> {
            if let Some(error) = self.take_error() {
                return Err(error);
            }
            Ok(self.find_by_email(course_id, email))
        }

        async fn get_by_google_id(
            &self,
            course_id: &str,
            google_id: &str,
        ) -> Result<Option<InstructorAttributes>, StoreError> {
            if let Some(error) = self.take_error() {
                return Err(error);
            }
            Ok(self
                .records
                .lock()
                .unwrap()
                .values()
                .find(|r| {
                    r.course_id == course_id && r.google_id.as_deref() == Some(google_id)
                })
                .cloned())
        }

        async fn get_by_registration_key(
            &self,
            registration_key: &str,
        ) -> Result<Option<InstructorAttributes>, StoreError> {
            if let Some(error) = self.take_error() {
                return Err(error);
            }
            Ok(self
                .records
                .lock()
                .unwrap()
                .values()
                .find(|r| r.registration_key.as_deref() == Some(registration_key))
                .cloned())
        }

        async fn list_for_course(
            &self,
            course_id: &str,
        ) -> Result<Vec<InstructorAttributes>, StoreError> {
            if let Some(error) = self.take_error() {
                return Err(error);
            }
            Ok(self
                .records
                .lock()
                .unwrap()
                .values()
                .filter(|r| r.course_id == course_id)
                .cloned()
                .collect())
        }

        async fn list_for_courses(
            &self,
            course_ids: &[String],
        ) -> Result<Vec<InstructorAttributes>, StoreError> {
            if let Some(error) = self.take_error() {
                return Err(error);
            }
            let mut result: Vec<InstructorAttributes> = self
                .records
                .lock()
                .unwrap()
                .values()
                .filter(|r| course_ids.contains(&r.course_id))
                .cloned()
                .collect();
            result.extend(
                self.phantom_records
                    .lock()
                    .unwrap()
                    .iter()
                    .filter(|r| course_ids.contains(&r.course_id))
                    .cloned(),
            );
            Ok(result)
        }

        async fn list_for_google_id(
            &self,
            google_id: &str,
            omit_archived: bool,
        ) -> Result<Vec<InstructorAttributes>, StoreError> {
            if let Some(error) = self.take_error() {
                return Err(error);
            }
            Ok(self
                .records
                .lock()
                .unwrap()
                .values()
                .filter(|r| r.google_id.as_deref() == Some(google_id))
                .filter(|r| !omit_archived || !r.is_archived)
                .cloned()
                .collect())
        }

        async fn list_for_email(
            &self,
            email: &str,
        ) -> Result<Vec<InstructorAttributes>, StoreError> {
            if let Some(error) = self.take_error() {
                return Err(error);
            }
            Ok(self
                .records
                .lock()
                .unwrap()
                .values()
                .filter(|r| r.email == email)
                .cloned()
                .collect())
        }

        async fn list_all(&self) -> Result<Vec<InstructorAttributes>, StoreError> {
            if let Some(error) = self.take_error() {
                return Err(error);
            }
            Ok(self.records.lock().unwrap().values().cloned().collect())
        }

        async fn exists(&self, course_id: &str, email: &str) -> Result<bool, StoreError> {
            if let Some(error) = self.take_error() {
                return Err(error);
            }
            Ok(self.find_by_email(course_id, email).is_some())
        }

        async fn insert(
            &self,
            record: InstructorAttributes,
        ) -> Result<InstructorAttributes, StoreError> {
            if let Some(error) = self.take_error() {
                return Err(error);
            }
            let record = DynamoInstructorStore::assign_keys(record);
            let record_id = record.key.clone().unwrap();
            self.records
                .lock()
                .unwrap()
                .insert(record_id, record.clone());
            Ok(record)
        }

        async fn insert_batch(
            &self,
            records: Vec<InstructorAttributes>,
        ) -> Result<Vec<InstructorAttributes>, StoreError> {
            if let Some(error) = self.take_error() {
                return Err(error);
            }
            let mut inserted = Vec::with_capacity(records.len());
            for record in records {
                let record = DynamoInstructorStore::assign_keys(record);
                let record_id = record.key.clone().unwrap();
                self.records
                    .lock()
                    .unwrap()
                    .insert(record_id, record.clone());
                inserted.push(record);
            }
            Ok(inserted)
        }

        async fn update(&self, record: &InstructorAttributes) -> Result<(), StoreError> {
            if let Some(error) = self.take_error() {
                return Err(error);
            }
            let Some(record_id) = record.key.clone() else {
                return Err(StoreError::WriteError("store key is not set".to_string()));
            };
            self.records
                .lock()
                .unwrap()
                .insert(record_id, record.clone());
            Ok(())
        }

        async fn delete(&self, record: &InstructorAttributes) -> Result<(), StoreError> {
            if let Some(error) = self.take_error() {
                return Err(error);
            }
            if let Some(record_id) = &record.key {
                self.records.lock().unwrap().remove(record_id);
            }
            // 削除と並行した再作成を再現
            if let Some(recreated) = self.recreate_on_delete.lock().unwrap().take() {
                let record_id = recreated.key.clone().unwrap_or_else(|| {
                    Uuid::new_v4().to_string()
                });
                let mut recreated = recreated;
                recreated.key = Some(record_id.clone());
                self.records.lock().unwrap().insert(record_id, recreated);
            }
            Ok(())
        }

        async fn delete_batch(
            &self,
            records: &[InstructorAttributes],
        ) -> Result<(), StoreError> {
            if let Some(error) = self.take_error() {
                return Err(error);
            }
            let mut map = self.records.lock().unwrap();
            for record in records {
                if let Some(record_id) = &record.key {
                    map.remove(record_id);
                }
            }
            Ok(())
        }
    }

    // ==================== モックストアの動作テスト ====================

    fn new_record(course_id: &str, name: &str, email: &str) -> InstructorAttributes {
        InstructorAttributes::new(course_id, name, email)
    }

    #[tokio::test]
    async fn test_mock_insert_assigns_keys() {
        let store = MockInstructorStore::new();

        let inserted = store
            .insert(new_record("CS101", "Alice", "alice@example.com"))
            .await
            .unwrap();

        assert!(inserted.key.is_some());
        assert!(inserted.registration_key.is_some());
        assert_eq!(store.record_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_get_by_email_miss_is_none() {
        let store = MockInstructorStore::new();

        let result = store.get_by_email("CS101", "nobody@example.com").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_mock_get_by_google_id() {
        let store = MockInstructorStore::new();
        let mut record = new_record("CS101", "Alice", "alice@example.com");
        record.google_id = Some("alice.g".to_string());
        store.insert(record).await.unwrap();

        let found = store.get_by_google_id("CS101", "alice.g").await.unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().email, "alice@example.com");

        let missing = store.get_by_google_id("CS102", "alice.g").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_mock_get_by_registration_key() {
        let store = MockInstructorStore::new();
        let inserted = store
            .insert(new_record("CS101", "Alice", "alice@example.com"))
            .await
            .unwrap();

        let registration_key = inserted.registration_key.clone().unwrap();
        let found = store
            .get_by_registration_key(&registration_key)
            .await
            .unwrap();

        assert_eq!(found, Some(inserted));
    }

    #[tokio::test]
    async fn test_mock_list_for_google_id_omit_archived() {
        let store = MockInstructorStore::new();

        let mut active = new_record("CS101", "Alice", "alice@example.com");
        active.google_id = Some("alice.g".to_string());
        store.insert(active).await.unwrap();

        let mut archived = new_record("CS102", "Alice", "alice@example.com");
        archived.google_id = Some("alice.g".to_string());
        archived.is_archived = true;
        store.insert(archived).await.unwrap();

        let all = store.list_for_google_id("alice.g", false).await.unwrap();
        assert_eq!(all.len(), 2);

        let active_only = store.list_for_google_id("alice.g", true).await.unwrap();
        assert_eq!(active_only.len(), 1);
        assert_eq!(active_only[0].course_id, "CS101");
    }

    #[tokio::test]
    async fn test_mock_delete_batch() {
        let store = MockInstructorStore::new();
        let a = store
            .insert(new_record("CS101", "Alice", "alice@example.com"))
            .await
            .unwrap();
        let b = store
            .insert(new_record("CS101", "Bob", "bob@example.com"))
            .await
            .unwrap();
        store
            .insert(new_record("CS102", "Carol", "carol@example.com"))
            .await
            .unwrap();

        store.delete_batch(&[a, b]).await.unwrap();

        assert_eq!(store.record_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_error_injection() {
        let store = MockInstructorStore::new();
        store.set_next_error(StoreError::ReadError("DynamoDB unavailable".to_string()));

        let result = store.get_by_email("CS101", "alice@example.com").await;
        assert!(result.is_err());

        // エラーは1回だけ返る
        let result = store.get_by_email("CS101", "alice@example.com").await;
        assert!(result.is_ok());
    }

    // 注意: DynamoInstructorStoreのネットワーク越しの動作（scan、put_item、
    // batch_write_item）は実際のDynamoDB接続を必要とするため統合テストで実行
}
