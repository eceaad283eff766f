// 講師レコードのドメインモデル
//
// 業務上の識別子は (course_id, email) の組。google_idと登録キーは
// コース内で一意な代替参照キーとして扱う。ストアキー（key）は
// プライマリストアが割り当てる内部識別子で、キー導入以前に作られた
// レガシーレコードではNoneになり得る。

use serde::{Deserialize, Serialize};

use super::validation::FieldValidator;

/// コースの共同オーナー
pub const ROLE_COOWNER: &str = "Co-owner";
/// コースの管理者
pub const ROLE_MANAGER: &str = "Manager";
/// 閲覧のみ
pub const ROLE_OBSERVER: &str = "Observer";
/// チューター
pub const ROLE_TUTOR: &str = "Tutor";
/// 個別権限設定
pub const ROLE_CUSTOM: &str = "Custom";

/// 有効なロールの一覧
pub const ROLES: [&str; 5] = [
    ROLE_COOWNER,
    ROLE_MANAGER,
    ROLE_OBSERVER,
    ROLE_TUTOR,
    ROLE_CUSTOM,
];

/// 学生向け表示名のデフォルト値
pub const DEFAULT_DISPLAYED_NAME: &str = "Instructor";

/// 講師の細粒度権限フラグ
///
/// 永続化時はJSONテキストとしてシリアライズされる（as_text / from_text）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructorPrivileges {
    pub can_modify_course: bool,
    pub can_modify_instructor: bool,
    pub can_modify_session: bool,
    pub can_modify_student: bool,
    pub can_view_student_in_sections: bool,
    pub can_view_session_in_sections: bool,
    pub can_submit_session_in_sections: bool,
    pub can_modify_session_comments_in_sections: bool,
}

impl InstructorPrivileges {
    /// ロールに応じた権限セットを作成
    pub fn for_role(role: &str) -> Self {
        match role {
            ROLE_COOWNER => Self::all(true),
            ROLE_MANAGER => Self {
                can_modify_course: false,
                ..Self::all(true)
            },
            ROLE_OBSERVER => Self {
                can_view_student_in_sections: true,
                can_view_session_in_sections: true,
                ..Self::all(false)
            },
            ROLE_TUTOR => Self {
                can_view_student_in_sections: true,
                can_view_session_in_sections: true,
                can_submit_session_in_sections: true,
                ..Self::all(false)
            },
            // Customは明示的に付与されるまで全権限なし
            _ => Self::all(false),
        }
    }

    fn all(value: bool) -> Self {
        Self {
            can_modify_course: value,
            can_modify_instructor: value,
            can_modify_session: value,
            can_modify_student: value,
            can_view_student_in_sections: value,
            can_view_session_in_sections: value,
            can_submit_session_in_sections: value,
            can_modify_session_comments_in_sections: value,
        }
    }

    /// 永続化用のJSONテキストへ変換
    pub fn as_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// 永続化されたJSONテキストから復元
    pub fn from_text(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

impl Default for InstructorPrivileges {
    fn default() -> Self {
        Self::for_role(ROLE_COOWNER)
    }
}

/// 講師レコード
///
/// (course_id, email) が削除されていないレコードの中で一意。
/// google_idはコースをまたいで一意である必要はない。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructorAttributes {
    /// 所属コースID
    pub course_id: String,
    /// 講師名
    pub name: String,
    /// メールアドレス（業務識別子の片割れ）
    pub email: String,
    /// GoogleアカウントID（None = 未登録状態）
    pub google_id: Option<String>,
    /// ロール（ROLE_* のいずれか）
    pub role: String,
    /// コース単位のアーカイブフラグ
    pub is_archived: bool,
    /// 学生に表示するかどうか
    pub is_displayed_to_students: bool,
    /// 学生向け表示名
    pub displayed_name: String,
    /// 細粒度権限フラグ
    pub privileges: InstructorPrivileges,
    /// 登録キー（不透明トークン、挿入時にストアが採番）
    pub registration_key: Option<String>,
    /// ストアキー（レガシーレコードではNone）
    pub key: Option<String>,
}

impl InstructorAttributes {
    /// 新しい講師レコードを作成（ストアキー・登録キーは未割り当て）
    pub fn new(course_id: &str, name: &str, email: &str) -> Self {
        Self {
            course_id: course_id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            google_id: None,
            role: ROLE_COOWNER.to_string(),
            is_archived: false,
            is_displayed_to_students: true,
            displayed_name: DEFAULT_DISPLAYED_NAME.to_string(),
            privileges: InstructorPrivileges::for_role(ROLE_COOWNER),
            registration_key: None,
            key: None,
        }
    }

    /// 全フィールドが妥当かどうか
    pub fn is_valid(&self) -> bool {
        self.invalidity_info().is_empty()
    }

    /// 妥当性診断メッセージの一覧（空 = 妥当）
    pub fn invalidity_info(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if let Some(msg) = FieldValidator::invalidity_for_course_id(&self.course_id) {
            errors.push(msg);
        }
        if let Some(msg) = FieldValidator::invalidity_for_name(&self.name) {
            errors.push(msg);
        }
        if let Some(msg) = FieldValidator::invalidity_for_email(&self.email) {
            errors.push(msg);
        }
        if let Some(msg) = FieldValidator::invalidity_for_role(&self.role) {
            errors.push(msg);
        }
        if let Some(msg) = FieldValidator::invalidity_for_displayed_name(&self.displayed_name) {
            errors.push(msg);
        }

        errors
    }

    /// 永続化前の正規化
    ///
    /// 前後の空白を除去し、空のgoogle_idはNoneに畳み込む。
    pub fn sanitize_for_saving(&mut self) {
        self.course_id = self.course_id.trim().to_string();
        self.name = self.name.trim().to_string();
        self.email = self.email.trim().to_string();
        self.role = self.role.trim().to_string();
        self.displayed_name = self.displayed_name.trim().to_string();
        self.google_id = self
            .google_id
            .take()
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty());
    }
}
