// DynamoDBで管理者メールを管理するためのレコードストアアダプター
//
// パーティションキーは`email_id`。下書き・送信済み・ごみ箱の区分は
// send_dateの有無とis_in_trash_binフラグによるフィルタースキャンで行う。

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use chrono::DateTime;
use tracing::debug;
use uuid::Uuid;

use crate::domain::AdminEmailAttributes;
use crate::infrastructure::instructor_store::StoreError;

/// 管理者メールの永続化用トレイト
#[async_trait]
pub trait AdminEmailStore: Send + Sync {
    /// メールを保存。未採番ならストアキーを採番して返す
    async fn save(
        &self,
        email: AdminEmailAttributes,
    ) -> Result<AdminEmailAttributes, StoreError>;

    /// ストアキーでポイント参照
    async fn get_by_id(
        &self,
        email_id: &str,
    ) -> Result<Option<AdminEmailAttributes>, StoreError>;

    /// ごみ箱に入っていない下書き
    async fn list_drafts(&self) -> Result<Vec<AdminEmailAttributes>, StoreError>;

    /// ごみ箱に入っていない送信済みメール
    async fn list_sent(&self) -> Result<Vec<AdminEmailAttributes>, StoreError>;

    /// ごみ箱の中のメール
    async fn list_trash(&self) -> Result<Vec<AdminEmailAttributes>, StoreError>;

    /// ごみ箱フラグを切り替える
    async fn set_trash_bin(
        &self,
        email_id: &str,
        is_in_trash_bin: bool,
    ) -> Result<(), StoreError>;

    /// メールを完全に削除
    async fn delete(&self, email_id: &str) -> Result<(), StoreError>;
}

/// AdminEmailStoreのDynamoDB実装
#[derive(Debug, Clone)]
pub struct DynamoAdminEmailStore {
    /// DynamoDBクライアント
    client: DynamoDbClient,
    /// 管理者メールテーブル名
    table_name: String,
}

impl DynamoAdminEmailStore {
    /// 新しいDynamoAdminEmailStoreを作成
    pub fn new(client: DynamoDbClient, table_name: String) -> Self {
        Self { client, table_name }
    }

    /// メールをDynamoDBの属性マップへ変換
    fn build_item(email: &AdminEmailAttributes) -> Result<HashMap<String, AttributeValue>, StoreError> {
        let email_id = email
            .email_id
            .as_ref()
            .ok_or_else(|| StoreError::WriteError("store key is not set".to_string()))?;

        fn string_list(values: &[String]) -> AttributeValue {
            AttributeValue::L(values.iter().cloned().map(AttributeValue::S).collect())
        }

        let mut item = HashMap::new();
        item.insert("email_id".to_string(), AttributeValue::S(email_id.clone()));
        item.insert(
            "address_receiver".to_string(),
            string_list(&email.address_receiver),
        );
        item.insert(
            "group_receiver".to_string(),
            string_list(&email.group_receiver),
        );
        item.insert("subject".to_string(), AttributeValue::S(email.subject.clone()));
        item.insert("content".to_string(), AttributeValue::S(email.content.clone()));
        item.insert(
            "create_date".to_string(),
            AttributeValue::N(email.create_date.timestamp_millis().to_string()),
        );
        item.insert(
            "is_in_trash_bin".to_string(),
            AttributeValue::Bool(email.is_in_trash_bin),
        );
        if let Some(send_date) = &email.send_date {
            item.insert(
                "send_date".to_string(),
                AttributeValue::N(send_date.timestamp_millis().to_string()),
            );
        }

        Ok(item)
    }

    /// DynamoDBの属性マップからメールを復元
    fn email_from_item(
        item: &HashMap<String, AttributeValue>,
    ) -> Result<AdminEmailAttributes, StoreError> {
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

        fn string_list(
            item: &HashMap<String, AttributeValue>,
            field: &str,
        ) -> Vec<String> {
            item.get(field)
                .and_then(|v| v.as_l().ok())
                .map(|values| {
                    values
                        .iter()
                        .filter_map(|v| v.as_s().ok())
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        }

        fn timestamp(
            item: &HashMap<String, AttributeValue>,
            field: &str,
        ) -> Result<Option<chrono::DateTime<chrono::Utc>>, StoreError> {
            let Some(value) = item.get(field).and_then(|v| v.as_n().ok()) else {
                return Ok(None);
            };
            let millis: i64 = value.parse().map_err(|_| {
                StoreError::SerializationError(format!("invalid timestamp: {}", field))
            })?;
            DateTime::from_timestamp_millis(millis)
                .map(Some)
                .ok_or_else(|| {
                    StoreError::SerializationError(format!("invalid timestamp: {}", field))
                })
        }

        let create_date = timestamp(item, "create_date")?.ok_or_else(|| {
            StoreError::SerializationError("missing field: create_date".to_string())
        })?;

        Ok(AdminEmailAttributes {
            email_id: Some(required(item, "email_id")?),
            address_receiver: string_list(item, "address_receiver"),
            group_receiver: string_list(item, "group_receiver"),
            subject: required(item, "subject")?,
            content: required(item, "content")?,
            send_date: timestamp(item, "send_date")?,
            create_date,
            is_in_trash_bin: item
                .get("is_in_trash_bin")
                .and_then(|v| v.as_bool().ok())
                .copied()
                .unwrap_or(false),
        })
    }

    /// フィルター式付きスキャン（ページネーション対応）
    async fn scan_emails(
        &self,
        expression: &str,
        values: Vec<(String, AttributeValue)>,
    ) -> Result<Vec<AdminEmailAttributes>, StoreError> {
        let mut emails = Vec::new();
        let mut last_evaluated_key = None;

        loop {
            let mut builder = self
                .client
                .scan()
                .table_name(&self.table_name)
                .filter_expression(expression);

            for (name, value) in &values {
                builder = builder.expression_attribute_values(name, value.clone());
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
                    emails.push(Self::email_from_item(item)?);
                }
            }

            match result.last_evaluated_key {
                Some(key) => last_evaluated_key = Some(key),
                None => break,
            }
        }

        Ok(emails)
    }
}

#[async_trait]
impl AdminEmailStore for DynamoAdminEmailStore {
    async fn save(
        &self,
        mut email: AdminEmailAttributes,
    ) -> Result<AdminEmailAttributes, StoreError> {
        if email.email_id.is_none() {
            email.email_id = Some(Uuid::new_v4().to_string());
        }

        let item = Self::build_item(&email)?;

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| StoreError::WriteError(e.into_service_error().to_string()))?;

        debug!(subject = %email.subject, "管理者メールを保存");

        Ok(email)
    }

    async fn get_by_id(
        &self,
        email_id: &str,
    ) -> Result<Option<AdminEmailAttributes>, StoreError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("email_id", AttributeValue::S(email_id.to_string()))
            .send()
            .await
            .map_err(|e| StoreError::ReadError(e.into_service_error().to_string()))?;

        match result.item {
            Some(item) => Ok(Some(Self::email_from_item(&item)?)),
            None => Ok(None),
        }
    }

    async fn list_drafts(&self) -> Result<Vec<AdminEmailAttributes>, StoreError> {
        self.scan_emails(
            "attribute_not_exists(send_date) AND is_in_trash_bin <> :t",
            vec![(":t".to_string(), AttributeValue::Bool(true))],
        )
        .await
    }

    async fn list_sent(&self) -> Result<Vec<AdminEmailAttributes>, StoreError> {
        self.scan_emails(
            "attribute_exists(send_date) AND is_in_trash_bin <> :t",
            vec![(":t".to_string(), AttributeValue::Bool(true))],
        )
        .await
    }

    async fn list_trash(&self) -> Result<Vec<AdminEmailAttributes>, StoreError> {
        self.scan_emails(
            "is_in_trash_bin = :t",
            vec![(":t".to_string(), AttributeValue::Bool(true))],
        )
        .await
    }

    async fn set_trash_bin(
        &self,
        email_id: &str,
        is_in_trash_bin: bool,
    ) -> Result<(), StoreError> {
        self.client
            .update_item()
            .table_name(&self.table_name)
            .key("email_id", AttributeValue::S(email_id.to_string()))
            .update_expression("SET is_in_trash_bin = :t")
            .condition_expression("attribute_exists(email_id)")
            .expression_attribute_values(":t", AttributeValue::Bool(is_in_trash_bin))
            .send()
            .await
            .map_err(|e| StoreError::WriteError(e.into_service_error().to_string()))?;

        Ok(())
    }

    async fn delete(&self, email_id: &str) -> Result<(), StoreError> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key("email_id", AttributeValue::S(email_id.to_string()))
            .send()
            .await
            .map_err(|e| StoreError::WriteError(e.into_service_error().to_string()))?;

        Ok(())
    }
}
