// 管理者が作成するメールのドメインモデル

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 管理者作成メール
///
/// send_dateがNoneの間は下書き。送信済みになるとSome。
/// ごみ箱フラグは削除の前段階として使う。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminEmailAttributes {
    /// ストアキー（保存時に採番、未保存ならNone）
    pub email_id: Option<String>,
    /// 個別アドレス宛先
    pub address_receiver: Vec<String>,
    /// アップロード済み宛先リストファイルへの参照
    pub group_receiver: Vec<String>,
    /// 件名
    pub subject: String,
    /// HTML本文
    pub content: String,
    /// 送信日時（None = 下書き）
    pub send_date: Option<DateTime<Utc>>,
    /// 作成日時
    pub create_date: DateTime<Utc>,
    /// ごみ箱に入っているか
    pub is_in_trash_bin: bool,
}

impl AdminEmailAttributes {
    /// 新しいメールを作成（作成日時は現在時刻）
    pub fn new(
        address_receiver: Vec<String>,
        group_receiver: Vec<String>,
        subject: &str,
        content: &str,
        send_date: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            email_id: None,
            address_receiver,
            group_receiver,
            subject: subject.to_string(),
            content: content.to_string(),
            send_date,
            create_date: Utc::now(),
            is_in_trash_bin: false,
        }
    }

    /// 下書きかどうか
    pub fn is_draft(&self) -> bool {
        self.send_date.is_none()
    }
}
