// 管理者メールのオーケストレーション層
//
// 検索インデックスを持たないため、レコードストアの操作だけを
// 順序付ける薄い層。

use thiserror::Error;
use tracing::debug;

use crate::domain::AdminEmailAttributes;
use crate::infrastructure::admin_email_store::AdminEmailStore;
use crate::infrastructure::instructor_store::StoreError;

/// 管理者メール操作のエラー型
#[derive(Debug, Error)]
pub enum AdminEmailsDbError {
    /// 対象のメールが存在しない
    #[error("Admin email does not exist: {0}")]
    DoesNotExist(String),

    /// レコードストアのエラー
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// 管理者メールのCRUD
#[derive(Debug, Clone)]
pub struct AdminEmailsDb<S> {
    /// レコードストア
    store: S,
}

impl<S> AdminEmailsDb<S>
where
    S: AdminEmailStore,
{
    /// 新しいAdminEmailsDbを作成
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// メールを新規作成する。ストアキーが採番されたメールを返す
    pub async fn create(
        &self,
        email: AdminEmailAttributes,
    ) -> Result<AdminEmailAttributes, AdminEmailsDbError> {
        let created = self.store.save(email).await?;
        debug!(
            email_id = created.email_id.as_deref().unwrap_or(""),
            subject = %created.subject,
            "管理者メールを作成"
        );
        Ok(created)
    }

    /// 既存のメールを上書きする
    pub async fn update(
        &self,
        email: AdminEmailAttributes,
    ) -> Result<AdminEmailAttributes, AdminEmailsDbError> {
        let Some(email_id) = email.email_id.clone() else {
            return Err(AdminEmailsDbError::DoesNotExist(
                "store key is not set".to_string(),
            ));
        };

        if self.store.get_by_id(&email_id).await?.is_none() {
            return Err(AdminEmailsDbError::DoesNotExist(email_id));
        }

        Ok(self.store.save(email).await?)
    }

    /// ストアキーでポイント参照
    pub async fn get(
        &self,
        email_id: &str,
    ) -> Result<Option<AdminEmailAttributes>, AdminEmailsDbError> {
        Ok(self.store.get_by_id(email_id).await?)
    }

    /// ごみ箱に入っていない下書き
    pub async fn get_drafts(&self) -> Result<Vec<AdminEmailAttributes>, AdminEmailsDbError> {
        Ok(self.store.list_drafts().await?)
    }

    /// ごみ箱に入っていない送信済みメール
    pub async fn get_sent(&self) -> Result<Vec<AdminEmailAttributes>, AdminEmailsDbError> {
        Ok(self.store.list_sent().await?)
    }

    /// ごみ箱の中のメール
    pub async fn get_trash(&self) -> Result<Vec<AdminEmailAttributes>, AdminEmailsDbError> {
        Ok(self.store.list_trash().await?)
    }

    /// メールをごみ箱に移動する
    pub async fn move_to_trash(&self, email_id: &str) -> Result<(), AdminEmailsDbError> {
        if self.store.get_by_id(email_id).await?.is_none() {
            return Err(AdminEmailsDbError::DoesNotExist(email_id.to_string()));
        }
        self.store.set_trash_bin(email_id, true).await?;
        Ok(())
    }

    /// メールをごみ箱から戻す
    pub async fn restore_from_trash(&self, email_id: &str) -> Result<(), AdminEmailsDbError> {
        if self.store.get_by_id(email_id).await?.is_none() {
            return Err(AdminEmailsDbError::DoesNotExist(email_id.to_string()));
        }
        self.store.set_trash_bin(email_id, false).await?;
        Ok(())
    }

    /// メールを完全に削除する（冪等）
    pub async fn delete(&self, email_id: &str) -> Result<(), AdminEmailsDbError> {
        self.store.delete(email_id).await?;
        Ok(())
    }
}
