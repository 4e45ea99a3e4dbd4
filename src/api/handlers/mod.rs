//! HTTP handlers and the input checks they share.

pub mod auth;
pub mod health;

use regex::Regex;

pub(crate) use crate::auth::code::valid_code_format as valid_code;

/// Basic `local@domain.tld` shape check.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

/// At least 8 characters with a digit, a lowercase and an uppercase letter.
pub fn valid_password(password: &str) -> bool {
    password.chars().count() >= 8
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(char::is_lowercase)
        && password.chars().any(char::is_uppercase)
}
