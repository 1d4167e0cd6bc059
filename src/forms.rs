//! Typed form bodies and their validation.
//!
//! Each form deserializes from `application/x-www-form-urlencoded` via
//! `axum::Form` and carries a `validate` method returning a [`Validator`]
//! holding every failed check. Only the first error per field is kept.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

pub const MSG_BLANK: &str = "This field cannot be blank";
pub const MSG_TITLE_TOO_LONG: &str = "This field cannot be more than 100 characters long";
pub const MSG_EXPIRES: &str = "This field must equal 1, 7 or 365";
pub const MSG_EMAIL: &str = "This field must be a valid email address";
pub const MSG_PASSWORD_SHORT: &str = "This field must be at least 8 characters long";
pub const MSG_PASSWORD_MISMATCH: &str = "Passwords do not match";
pub const MSG_DUPLICATE_EMAIL: &str = "Email address is already in use";
pub const MSG_BAD_LOGIN: &str = "Email or password is incorrect";
pub const MSG_BAD_CURRENT_PASSWORD: &str = "Current password is incorrect";

pub const TITLE_MAX_CHARS: usize = 100;
pub const PASSWORD_MIN_CHARS: usize = 8;
pub const EXPIRY_CHOICES: [i32; 3] = [1, 7, 365];

static EMAIL_RX: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .ok()
});

// =============================================================================
// Validator
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validator {
    pub field_errors: BTreeMap<&'static str, String>,
    pub non_field_errors: Vec<String>,
}

impl Validator {
    #[must_use]
    pub fn valid(&self) -> bool {
        self.field_errors.is_empty() && self.non_field_errors.is_empty()
    }

    pub fn add_field_error(&mut self, field: &'static str, message: impl Into<String>) {
        self.field_errors.entry(field).or_insert_with(|| message.into());
    }

    pub fn add_non_field_error(&mut self, message: impl Into<String>) {
        self.non_field_errors.push(message.into());
    }

    pub fn check_field(&mut self, ok: bool, field: &'static str, message: &str) {
        if !ok {
            self.add_field_error(field, message);
        }
    }

    #[must_use]
    pub fn field_error(&self, field: &str) -> Option<&str> {
        self.field_errors.get(field).map(String::as_str)
    }
}

#[must_use]
pub fn not_blank(value: &str) -> bool {
    !value.trim().is_empty()
}

#[must_use]
pub fn max_chars(value: &str, n: usize) -> bool {
    value.chars().count() <= n
}

#[must_use]
pub fn min_chars(value: &str, n: usize) -> bool {
    value.chars().count() >= n
}

#[must_use]
pub fn permitted<T: PartialEq>(value: &T, allowed: &[T]) -> bool {
    allowed.contains(value)
}

#[must_use]
pub fn matches_email(value: &str) -> bool {
    EMAIL_RX.as_ref().is_some_and(|rx| rx.is_match(value))
}

// =============================================================================
// Forms
// =============================================================================

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NoteForm {
    pub title: String,
    pub content: String,
    pub expires: i32,
}

impl Default for NoteForm {
    fn default() -> Self {
        Self { title: String::new(), content: String::new(), expires: 365 }
    }
}

impl NoteForm {
    #[must_use]
    pub fn validate(&self) -> Validator {
        let mut v = Validator::default();
        v.check_field(not_blank(&self.title), "title", MSG_BLANK);
        v.check_field(max_chars(&self.title, TITLE_MAX_CHARS), "title", MSG_TITLE_TOO_LONG);
        v.check_field(not_blank(&self.content), "content", MSG_BLANK);
        v.check_field(permitted(&self.expires, &EXPIRY_CHOICES), "expires", MSG_EXPIRES);
        v
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl SignupForm {
    #[must_use]
    pub fn validate(&self) -> Validator {
        let mut v = Validator::default();
        v.check_field(not_blank(&self.name), "name", MSG_BLANK);
        v.check_field(not_blank(&self.email), "email", MSG_BLANK);
        v.check_field(matches_email(&self.email), "email", MSG_EMAIL);
        v.check_field(not_blank(&self.password), "password", MSG_BLANK);
        v.check_field(min_chars(&self.password, PASSWORD_MIN_CHARS), "password", MSG_PASSWORD_SHORT);
        v
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    #[must_use]
    pub fn validate(&self) -> Validator {
        let mut v = Validator::default();
        v.check_field(not_blank(&self.email), "email", MSG_BLANK);
        v.check_field(matches_email(&self.email), "email", MSG_EMAIL);
        v.check_field(not_blank(&self.password), "password", MSG_BLANK);
        v
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PasswordUpdateForm {
    pub current_password: String,
    pub new_password: String,
    pub new_password_confirmation: String,
}

impl PasswordUpdateForm {
    #[must_use]
    pub fn validate(&self) -> Validator {
        let mut v = Validator::default();
        v.check_field(not_blank(&self.current_password), "current_password", MSG_BLANK);
        v.check_field(not_blank(&self.new_password), "new_password", MSG_BLANK);
        v.check_field(min_chars(&self.new_password, PASSWORD_MIN_CHARS), "new_password", MSG_PASSWORD_SHORT);
        v.check_field(not_blank(&self.new_password_confirmation), "new_password_confirmation", MSG_BLANK);
        v.check_field(
            self.new_password == self.new_password_confirmation,
            "new_password_confirmation",
            MSG_PASSWORD_MISMATCH,
        );
        v
    }
}

#[cfg(test)]
#[path = "forms_test.rs"]
mod tests;
