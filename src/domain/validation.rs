// 講師レコードの属性バリデーション
//
// ストアへの書き込み前に呼び出され、不合格の場合は人間が読める
// 診断メッセージを返す。ストア・インデックスには一切触れない。

use super::instructor::ROLES;

/// 講師名の最大長
pub const MAX_NAME_LENGTH: usize = 100;
/// メールアドレスの最大長
pub const MAX_EMAIL_LENGTH: usize = 254;
/// コースIDの最大長
pub const MAX_COURSE_ID_LENGTH: usize = 64;

/// フィールド単位のバリデーター
///
/// 各メソッドは不備がある場合のみ診断メッセージを返す。
pub struct FieldValidator;

impl FieldValidator {
    pub fn invalidity_for_course_id(course_id: &str) -> Option<String> {
        if course_id.trim().is_empty() {
            return Some("The field 'course ID' is empty.".to_string());
        }
        if course_id.len() > MAX_COURSE_ID_LENGTH {
            return Some(format!(
                "\"{}\" is not acceptable as a course ID because it is too long (maximum {} characters).",
                course_id, MAX_COURSE_ID_LENGTH
            ));
        }
        if course_id.contains(char::is_whitespace) {
            return Some(format!(
                "\"{}\" is not acceptable as a course ID because it contains whitespace.",
                course_id
            ));
        }
        None
    }

    pub fn invalidity_for_name(name: &str) -> Option<String> {
        if name.trim().is_empty() {
            return Some("The field 'person name' is empty.".to_string());
        }
        if name.len() > MAX_NAME_LENGTH {
            return Some(format!(
                "\"{}\" is not acceptable as a person name because it is too long (maximum {} characters).",
                name, MAX_NAME_LENGTH
            ));
        }
        None
    }

    pub fn invalidity_for_email(email: &str) -> Option<String> {
        let email = email.trim();
        if email.is_empty() {
            return Some("The field 'email' is empty.".to_string());
        }
        if email.len() > MAX_EMAIL_LENGTH {
            return Some(format!(
                "\"{}\" is not acceptable as an email because it is too long (maximum {} characters).",
                email, MAX_EMAIL_LENGTH
            ));
        }
        let valid_shape = match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.is_empty()
                    && !domain.contains('@')
                    && !email.contains(char::is_whitespace)
            }
            None => false,
        };
        if !valid_shape {
            return Some(format!(
                "\"{}\" is not acceptable as an email because it is not in the correct format.",
                email
            ));
        }
        None
    }

    pub fn invalidity_for_role(role: &str) -> Option<String> {
        if ROLES.contains(&role) {
            None
        } else {
            Some(format!(
                "\"{}\" is not an accepted instructor role.",
                role
            ))
        }
    }

    pub fn invalidity_for_displayed_name(displayed_name: &str) -> Option<String> {
        if displayed_name.trim().is_empty() {
            Some("The field 'displayed name' is empty.".to_string())
        } else {
            None
        }
    }
}
