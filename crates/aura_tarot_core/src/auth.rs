//! crates/aura_tarot_core/src/auth.rs
//!
//! Credential validation rules and the errors login/registration report.

use crate::domain::Language;
use crate::ports::PortError;

pub const MIN_USERNAME_LEN: usize = 2;
pub const MIN_PASSWORD_LEN: usize = 6;

/// Why a login or registration was refused. Shown inline on the form.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Username and password are required")]
    MissingCredentials,
    #[error("Username must be at least 2 characters")]
    UsernameTooShort,
    #[error("Password must be at least 6 characters")]
    PasswordTooShort,
    #[error("Username is already taken")]
    UsernameTaken,
    #[error("No account with that username")]
    UserNotFound,
    #[error("Wrong password")]
    WrongPassword,
    #[error("Storage error: {0}")]
    Storage(#[from] PortError),
}

impl AuthError {
    /// The message the form displays in the user's language.
    pub fn localized(&self, language: Language) -> &'static str {
        match (self, language) {
            (AuthError::MissingCredentials, Language::Zh) => "请填写用户名和密码",
            (AuthError::MissingCredentials, Language::En) => "Please enter a username and password",
            (AuthError::UsernameTooShort, Language::Zh) => "用户名至少 2 个字符",
            (AuthError::UsernameTooShort, Language::En) => "Username must be at least 2 characters",
            (AuthError::PasswordTooShort, Language::Zh) => "密码至少 6 位",
            (AuthError::PasswordTooShort, Language::En) => "Password must be at least 6 characters",
            (AuthError::UsernameTaken, Language::Zh) => "用户名已存在",
            (AuthError::UsernameTaken, Language::En) => "Username already exists",
            (AuthError::UserNotFound, Language::Zh) => "用户不存在",
            (AuthError::UserNotFound, Language::En) => "User does not exist",
            (AuthError::WrongPassword, Language::Zh) => "密码错误",
            (AuthError::WrongPassword, Language::En) => "Wrong password",
            (AuthError::Storage(_), Language::Zh) => "本地存储不可用，请稍后再试",
            (AuthError::Storage(_), Language::En) => "Local storage is unavailable, please try again",
        }
    }
}

/// Trimmed and lowercased; the key of the account table.
pub fn normalize_username(input: &str) -> String {
    input.trim().to_lowercase()
}

pub fn validate_login(username_key: &str, password: &str) -> Result<(), AuthError> {
    if username_key.is_empty() || password.is_empty() {
        return Err(AuthError::MissingCredentials);
    }
    Ok(())
}

/// Lengths are counted in characters so CJK usernames are measured fairly.
pub fn validate_registration(username_key: &str, password: &str) -> Result<(), AuthError> {
    if username_key.chars().count() < MIN_USERNAME_LEN {
        return Err(AuthError::UsernameTooShort);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::PasswordTooShort);
    }
    Ok(())
}
