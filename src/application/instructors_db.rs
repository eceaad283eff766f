// 講師レコードのオーケストレーション層
//
// 公開操作ごとにレコードストアの変更と検索インデックスの変更を
// 順序付ける。ストアが信頼できる情報源であり、インデックスへの
// 反映に失敗してもストアの変更は巻き戻さない（ベストエフォート同期）。

use std::collections::HashSet;

use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::InstructorAttributes;
use crate::infrastructure::instructor_store::{InstructorStore, StoreError};
use crate::infrastructure::key_cipher::RegistrationKeyCipher;
use crate::infrastructure::search::{
    IndexerError, InstructorIndexer, InstructorSearchResultBundle, SearchIndexBackend,
};

/// 講師レコード操作のエラー型
#[derive(Debug, Error)]
pub enum InstructorsDbError {
    /// 入力レコードがバリデーションに失敗
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// (courseId, email) が既に存在する
    #[error("Instructor already exists: {course_id}/{email}")]
    AlreadyExists { course_id: String, email: String },

    /// 更新対象が存在しない
    #[error("Update target does not exist: {identity} (thread: {context})")]
    UpdateTargetMissing { identity: String, context: String },

    /// ストア自身の読み取りと書き込みが矛盾した
    ///
    /// 存在すると分類されたレコードが更新時に見つからない場合。
    /// 再試行しても安全に続行できないため、明示的な致命エラーとして返す。
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// レコードストアのエラー
    #[error(transparent)]
    Store(#[from] StoreError),

    /// 検索の実行に失敗
    #[error("Search error: {0}")]
    Search(#[from] IndexerError),
}

/// 呼び出し元スレッドの診断用コンテキスト
fn current_thread_context() -> String {
    let thread = std::thread::current();
    format!("{}({:?})", thread.name().unwrap_or("unnamed"), thread.id())
}

/// 講師レコードのCRUDと検索インデックス同期
///
/// 検索はベストエフォートな二次コピーに対して行われるため、
/// レコードの存在判定には必ずストア側の参照を使うこと。
#[derive(Debug, Clone)]
pub struct InstructorsDb<S, B, C> {
    /// レコードストア
    store: S,
    /// ストアキーの暗号化（登録キートークンの復号にも使用）
    cipher: C,
    /// インデックス同期
    indexer: InstructorIndexer<S, B, C>,
}

impl<S, B, C> InstructorsDb<S, B, C>
where
    S: InstructorStore + Clone,
    B: SearchIndexBackend,
    C: RegistrationKeyCipher + Clone,
{
    /// 新しいInstructorsDbを作成
    pub fn new(store: S, backend: B, cipher: C) -> Self {
        let indexer = InstructorIndexer::new(store.clone(), backend, cipher.clone());
        Self {
            store,
            cipher,
            indexer,
        }
    }

    // ==================== 作成 ====================

    /// 講師レコードを1件作成し、インデックスに反映する
    ///
    /// 挿入に失敗した場合はインデックスには触れない。
    pub async fn create(
        &self,
        record: InstructorAttributes,
    ) -> Result<InstructorAttributes, InstructorsDbError> {
        let record = Self::sanitize_and_validate(record)?;

        if self.store.exists(&record.course_id, &record.email).await? {
            return Err(InstructorsDbError::AlreadyExists {
                course_id: record.course_id,
                email: record.email,
            });
        }

        let created = self.store.insert(record).await?;

        // ストアキーが採番されたのでインデックスに反映できる
        self.index_best_effort(&created).await;

        Ok(created)
    }

    /// 複数の講師レコードを作成し、インデックスに反映する
    ///
    /// (courseId, email) の既存集合を一度だけ計算して新規/既存に分類し、
    /// 新規は一括挿入、既存はメールキーの更新経路に回す。
    /// どちらもその後インデックスに反映される。
    pub async fn create_many(
        &self,
        records: Vec<InstructorAttributes>,
    ) -> Result<Vec<InstructorAttributes>, InstructorsDbError> {
        self.create_many_impl(records, true).await
    }

    /// インデックス反映なしで複数の講師レコードを作成する
    ///
    /// 一括インポート向けの最適化。インデックスへの反映は別パスで
    /// 後追いさせる前提。
    pub async fn create_many_without_searchability(
        &self,
        records: Vec<InstructorAttributes>,
    ) -> Result<Vec<InstructorAttributes>, InstructorsDbError> {
        self.create_many_impl(records, false).await
    }

    async fn create_many_impl(
        &self,
        records: Vec<InstructorAttributes>,
        with_index: bool,
    ) -> Result<Vec<InstructorAttributes>, InstructorsDbError> {
        // ストアに触れる前に全件をバリデーション
        let mut sanitized = Vec::with_capacity(records.len());
        for record in records {
            sanitized.push(Self::sanitize_and_validate(record)?);
        }

        // 既存集合を一度だけ計算する
        let course_ids: Vec<String> = sanitized
            .iter()
            .map(|r| r.course_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let existing: HashSet<(String, String)> = self
            .store
            .list_for_courses(&course_ids)
            .await?
            .into_iter()
            .map(|r| (r.course_id, r.email))
            .collect();

        let (to_update, to_insert): (Vec<_>, Vec<_>) = sanitized
            .into_iter()
            .partition(|r| existing.contains(&(r.course_id.clone(), r.email.clone())));

        let mut results = Vec::with_capacity(to_insert.len() + to_update.len());

        // 新規: 1回のグループ書き込みで挿入し、1件ずつインデックスに反映
        let inserted = self.store.insert_batch(to_insert).await?;
        for record in &inserted {
            if with_index {
                self.index_best_effort(record).await;
            }
        }
        results.extend(inserted);

        // 既存: メールキーの更新経路に回す
        for record in to_update {
            let identity = format!("{}/{}", record.course_id, record.email);
            let updated = match self.update_by_email_impl(record, with_index).await {
                Ok(updated) => updated,
                // 分類では存在するのに更新時に見つからない場合、
                // ストアの読み取りが直前の書き込みと矛盾している
                Err(InstructorsDbError::UpdateTargetMissing { .. }) => {
                    return Err(InstructorsDbError::InvariantViolation(format!(
                        "record classified as existing but missing on update: {}",
                        identity
                    )));
                }
                Err(e) => return Err(e),
            };
            results.push(updated);
        }

        Ok(results)
    }

    // ==================== 更新 ====================

    /// googleIdをキーに講師レコードを更新する
    ///
    /// course_idとgoogle_idは変更できない（参照キーのため）。
    /// 更新後のレコードをインデックスに反映する。
    pub async fn update_by_google_id(
        &self,
        record: InstructorAttributes,
    ) -> Result<InstructorAttributes, InstructorsDbError> {
        let record = Self::sanitize_and_validate(record)?;

        let Some(google_id) = record.google_id.clone() else {
            return Err(InstructorsDbError::InvalidParameters(
                "google id is not set".to_string(),
            ));
        };

        let Some(mut current) = self
            .store
            .get_by_google_id(&record.course_id, &google_id)
            .await?
        else {
            return Err(InstructorsDbError::UpdateTargetMissing {
                identity: format!("{}/{}", record.course_id, google_id),
                context: current_thread_context(),
            });
        };

        current.name = record.name;
        current.email = record.email;
        current.is_archived = record.is_archived;
        current.role = record.role;
        current.is_displayed_to_students = record.is_displayed_to_students;
        current.displayed_name = record.displayed_name;
        current.privileges = record.privileges;

        self.store.update(&current).await?;
        self.index_best_effort(&current).await;

        Ok(current)
    }

    /// メールアドレスをキーに講師レコードを更新する
    ///
    /// course_idとemailは変更できない。is_displayed_to_studentsは
    /// この経路では更新されない（googleIdキーの経路との非対称は
    /// 元の挙動をそのまま踏襲している）。
    pub async fn update_by_email(
        &self,
        record: InstructorAttributes,
    ) -> Result<InstructorAttributes, InstructorsDbError> {
        let record = Self::sanitize_and_validate(record)?;
        self.update_by_email_impl(record, true).await
    }

    /// update_by_emailの本体。呼び出し元がバリデーション済みであること
    async fn update_by_email_impl(
        &self,
        record: InstructorAttributes,
        with_index: bool,
    ) -> Result<InstructorAttributes, InstructorsDbError> {
        let Some(mut current) = self
            .store
            .get_by_email(&record.course_id, &record.email)
            .await?
        else {
            return Err(InstructorsDbError::UpdateTargetMissing {
                identity: format!("{}/{}", record.course_id, record.email),
                context: current_thread_context(),
            });
        };

        current.google_id = record.google_id;
        current.name = record.name;
        current.is_archived = record.is_archived;
        current.role = record.role;
        current.displayed_name = record.displayed_name;
        current.privileges = record.privileges;

        self.store.update(&current).await?;
        if with_index {
            self.index_best_effort(&current).await;
        }

        Ok(current)
    }

    // ==================== 削除 ====================

    /// (courseId, email) の講師レコードを削除する
    ///
    /// 対象が存在しなければ既に削除済みとして成功を返す（冪等）。
    /// 削除後に同じキーで読み直し、レコードがまだ見つかる場合
    /// （削除と並行した再作成など）はそのレコードをインデックスに
    /// 反映し直す。この補償リードは単件削除の経路だけで行う。
    pub async fn delete(&self, course_id: &str, email: &str) -> Result<(), InstructorsDbError> {
        let Some(target) = self.store.get_by_email(course_id, email).await? else {
            debug!(course_id = course_id, email = email, "削除対象が存在しないためスキップ");
            return Ok(());
        };

        self.remove_document_best_effort(&target).await;
        self.store.delete(&target).await?;

        // 補償リード: ストアの現状に合わせてインデックスを直す
        if let Some(survivor) = self.store.get_by_email(course_id, email).await? {
            self.index_best_effort(&survivor).await;
        }

        Ok(())
    }

    /// コース内の全講師レコードを削除する
    ///
    /// 各ドキュメントを個別に削除した後、ストアには1回のグループ削除を
    /// 発行する。単件削除のような補償リードは行わない。
    pub async fn delete_for_course(&self, course_id: &str) -> Result<(), InstructorsDbError> {
        let targets = self.store.list_for_course(course_id).await?;
        self.delete_bulk(targets).await
    }

    /// 複数コースの全講師レコードを削除する
    pub async fn delete_for_courses(
        &self,
        course_ids: &[String],
    ) -> Result<(), InstructorsDbError> {
        let targets = self.store.list_for_courses(course_ids).await?;
        self.delete_bulk(targets).await
    }

    /// googleIdに紐づく全講師レコードを削除する
    pub async fn delete_for_google_id(&self, google_id: &str) -> Result<(), InstructorsDbError> {
        let targets = self.store.list_for_google_id(google_id, false).await?;
        self.delete_bulk(targets).await
    }

    async fn delete_bulk(
        &self,
        targets: Vec<InstructorAttributes>,
    ) -> Result<(), InstructorsDbError> {
        if targets.is_empty() {
            return Ok(());
        }

        for target in &targets {
            self.remove_document_best_effort(target).await;
        }

        self.store.delete_batch(&targets).await?;
        Ok(())
    }

    // ==================== 参照 ====================

    /// (courseId, email) でポイント参照
    pub async fn get_for_email(
        &self,
        course_id: &str,
        email: &str,
    ) -> Result<Option<InstructorAttributes>, InstructorsDbError> {
        Ok(self.store.get_by_email(course_id, email).await?)
    }

    /// (courseId, googleId) でポイント参照
    pub async fn get_for_google_id(
        &self,
        course_id: &str,
        google_id: &str,
    ) -> Result<Option<InstructorAttributes>, InstructorsDbError> {
        Ok(self.store.get_by_google_id(course_id, google_id).await?)
    }

    /// 暗号化された登録キートークンでポイント参照
    ///
    /// 復号できないトークンは不在として扱う（エラーにしない）。
    pub async fn get_for_registration_key(
        &self,
        encrypted_key: &str,
    ) -> Result<Option<InstructorAttributes>, InstructorsDbError> {
        let registration_key = match self.cipher.decrypt(encrypted_key.trim()) {
            Ok(key) => key,
            Err(e) => {
                debug!(error = %e, "登録キートークンを復号できないため不在として扱う");
                return Ok(None);
            }
        };

        Ok(self
            .store
            .get_by_registration_key(&registration_key)
            .await?)
    }

    /// コース内の全講師
    pub async fn get_for_course(
        &self,
        course_id: &str,
    ) -> Result<Vec<InstructorAttributes>, InstructorsDbError> {
        Ok(self.store.list_for_course(course_id).await?)
    }

    /// googleIdに紐づく全講師。omit_archivedでアーカイブ済みを除外
    pub async fn get_for_google_id_all(
        &self,
        google_id: &str,
        omit_archived: bool,
    ) -> Result<Vec<InstructorAttributes>, InstructorsDbError> {
        Ok(self
            .store
            .list_for_google_id(google_id, omit_archived)
            .await?)
    }

    /// メールアドレスに紐づく全講師
    pub async fn get_for_email_all(
        &self,
        email: &str,
    ) -> Result<Vec<InstructorAttributes>, InstructorsDbError> {
        Ok(self.store.list_for_email(email).await?)
    }

    /// 全講師のフルスキャン
    ///
    /// スケールしないため管理者機能専用。
    pub async fn get_all(&self) -> Result<Vec<InstructorAttributes>, InstructorsDbError> {
        Ok(self.store.list_all().await?)
    }

    /// システム全体を対象とした全文検索
    ///
    /// 可視性フィルタリングは行わない。認可の判断は呼び出し元が
    /// 行うこと。
    pub async fn search_in_whole_system(
        &self,
        query_text: &str,
    ) -> Result<InstructorSearchResultBundle, InstructorsDbError> {
        Ok(self.indexer.search(query_text).await?)
    }

    // ==================== 内部ヘルパー ====================

    /// 正規化してバリデーション。失敗なら診断メッセージを返す
    fn sanitize_and_validate(
        mut record: InstructorAttributes,
    ) -> Result<InstructorAttributes, InstructorsDbError> {
        record.sanitize_for_saving();
        let errors = record.invalidity_info();
        if !errors.is_empty() {
            return Err(InstructorsDbError::InvalidParameters(errors.join("\n")));
        }
        Ok(record)
    }

    /// インデックス反映（失敗は警告ログのみ）
    async fn index_best_effort(&self, record: &InstructorAttributes) {
        if let Err(e) = self.indexer.put_document(record).await {
            warn!(
                error = %e,
                course_id = %record.course_id,
                email = %record.email,
                "検索ドキュメントの反映に失敗（ストアは更新済み）"
            );
        }
    }

    /// ドキュメント削除（失敗は警告ログのみ）
    async fn remove_document_best_effort(&self, record: &InstructorAttributes) {
        if let Err(e) = self.indexer.delete_document(record).await {
            warn!(
                error = %e,
                course_id = %record.course_id,
                email = %record.email,
                "検索ドキュメントの削除に失敗（ストアは更新済み）"
            );
        }
    }
}
