//! User-facing error messages.
//!
//! Backend errors arrive as machine codes (`error_username_exists`,
//! `password_too_short`, ...) either as `{"error": code}` or inside Django
//! REST Framework field-error arrays. This module maps them to localized text.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Display language for user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// Vietnamese, the language the service is written for
    #[default]
    Vi,
    En,
}

/// Known backend error codes with their localized text.
const ERROR_TABLE: &[(&str, &str, &str)] = &[
    (
        "error_username_exists",
        "Tên đăng nhập này đã được sử dụng.",
        "This username is already taken.",
    ),
    (
        "error_email_exists",
        "Địa chỉ email này đã được sử dụng.",
        "This email address is already in use.",
    ),
    (
        "error_password_incorrect",
        "Mật khẩu không đúng.",
        "Incorrect password.",
    ),
    (
        "error_old_password_incorrect",
        "Mật khẩu cũ không đúng.",
        "The current password is incorrect.",
    ),
    (
        "password_mismatch",
        "Mật khẩu xác nhận không khớp.",
        "The password confirmation does not match.",
    ),
    (
        "password_too_short",
        "Mật khẩu phải chứa ít nhất 8 ký tự.",
        "The password must contain at least 8 characters.",
    ),
    (
        "password_too_common",
        "Mật khẩu này quá phổ biến.",
        "This password is too common.",
    ),
    (
        "password_entirely_numeric",
        "Mật khẩu không được hoàn toàn là chữ số.",
        "The password cannot be entirely numeric.",
    ),
    (
        "password_too_similar",
        "Mật khẩu quá giống với các thông tin cá nhân khác.",
        "The password is too similar to your personal information.",
    ),
];

impl Locale {
    /// Looks up the text for a backend error code.
    pub fn lookup(self, code: &str) -> Option<&'static str> {
        ERROR_TABLE
            .iter()
            .find(|(known, _, _)| *known == code)
            .map(|(_, vi, en)| match self {
                Locale::Vi => *vi,
                Locale::En => *en,
            })
    }

    /// Fallback when nothing in the response body is usable.
    pub fn generic_error(self) -> &'static str {
        match self {
            Locale::Vi => "Đã xảy ra lỗi không mong muốn.",
            Locale::En => "An unexpected error occurred.",
        }
    }

    /// Shown when the session could not be refreshed.
    pub fn session_expired(self) -> &'static str {
        match self {
            Locale::Vi => "Phiên đăng nhập đã hết hạn. Vui lòng đăng nhập lại.",
            Locale::En => "Your session has expired. Please log in again.",
        }
    }

    /// Shown when a non-staff account tries an admin action.
    pub fn admin_only(self) -> &'static str {
        match self {
            Locale::Vi => "Bạn không có quyền truy cập trang quản trị.",
            Locale::En => "This action requires an administrator account.",
        }
    }

    /// Shown when an admin tries to lock another staff account.
    pub fn staff_lock_refused(self, username: &str) -> String {
        match self {
            Locale::Vi => format!("Không thể khóa tài khoản admin ({username})"),
            Locale::En => format!("Administrator accounts cannot be locked ({username})"),
        }
    }

    /// Shown when the server cannot be reached.
    pub fn network_error(self) -> &'static str {
        match self {
            Locale::Vi => "Không thể kết nối tới máy chủ.",
            Locale::En => "Could not reach the server.",
        }
    }
}

/// Turns an error response body into a single user-facing sentence.
///
/// Order: a known `error` code, then every string in DRF field arrays (each
/// mapped through the table), then `detail`, then the raw `error` value.
pub fn describe_error_body(body: &Value, locale: Locale) -> String {
    let Some(obj) = body.as_object() else {
        return locale.generic_error().to_string();
    };

    if let Some(code) = obj.get("error").and_then(Value::as_str)
        && let Some(text) = locale.lookup(code)
    {
        return text.to_string();
    }

    let field_messages: Vec<String> = obj
        .values()
        .filter_map(Value::as_array)
        .flatten()
        .filter_map(Value::as_str)
        .map(|msg| locale.lookup(msg).map_or_else(|| msg.to_string(), str::to_string))
        .collect();
    if !field_messages.is_empty() {
        return field_messages.join(" ");
    }

    if let Some(detail) = obj.get("detail").and_then(Value::as_str) {
        return detail.to_string();
    }

    match obj.get("error") {
        Some(Value::String(raw)) => raw.clone(),
        Some(nested @ Value::Object(_)) => describe_error_body(nested, locale),
        Some(other) if !other.is_null() => other.to_string(),
        _ => locale.generic_error().to_string(),
    }
}

/// Same as [`describe_error_body`] for a raw body that may not be JSON.
pub fn describe_error_text(body: &str, locale: Locale) -> String {
    serde_json::from_str::<Value>(body).map_or_else(
        |_| locale.generic_error().to_string(),
        |value| describe_error_body(&value, locale),
    )
}
