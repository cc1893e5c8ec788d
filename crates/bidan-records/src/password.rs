//! 密码策略与哈希
//!
//! 哈希使用 bcrypt (`$2b$...`)，兼容已有的 `$2a$` 账户。

use bidan_core::{BidanError, Result};
use tracing::warn;

const MIN_LENGTH: usize = 8;

/// 校验密码强度: 至少8位, 同时包含大写、小写、数字和特殊字符
pub fn validate_policy(password: &str) -> Result<()> {
    if password.chars().count() < MIN_LENGTH {
        return Err(BidanError::validation(
            "password",
            format!("must be at least {} characters long", MIN_LENGTH),
        ));
    }

    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| !c.is_ascii_alphanumeric());

    if !(has_upper && has_lower && has_digit && has_special) {
        return Err(BidanError::validation(
            "password",
            "must contain an uppercase letter, a lowercase letter, a digit and a special character",
        ));
    }
    Ok(())
}

pub fn hash_password(password: &str) -> Result<String> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| BidanError::Storage(format!("failed to hash password: {}", e)))
}

/// 校验密码; 无法解析的哈希视为不匹配
pub fn verify_password(password: &str, stored: &str) -> bool {
    match bcrypt::verify(password, stored) {
        Ok(matched) => matched,
        Err(e) => {
            warn!("Stored password hash is unreadable: {}", e);
            false
        }
    }
}
