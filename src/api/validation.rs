//! Input validation for API requests.
//!
//! Field validators return `Err(message)`; handlers collect them with
//! `ValidationErrorBuilder` from the `error` module.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Loose email shape check: something@something.tld, no whitespace
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[^@\s]+@[^@\s]+\.[^@\s]+$"
    ).unwrap();

    /// Regex for validating HTTP/HTTPS image URLs
    static ref HTTP_URL_REGEX: Regex = Regex::new(
        r"^https?://[a-zA-Z0-9][-a-zA-Z0-9]*(\.[a-zA-Z0-9][-a-zA-Z0-9]*)*(:\d+)?(/\S*)?$"
    ).unwrap();
}

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;
pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_CONTENT_LEN: usize = 5000;

/// Validate an email address
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email is too long (max 254 characters)".to_string());
    }

    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email address".to_string());
    }

    Ok(())
}

/// Validate a new password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        ));
    }

    if password.len() > 1024 {
        return Err("Password is too long".to_string());
    }

    Ok(())
}

/// Validate a required free-text field such as a name or category
pub fn validate_required(value: &str, label: &str, max_len: usize) -> Result<(), String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("{} is required", label));
    }

    if value.chars().count() > max_len {
        return Err(format!("{} is too long (max {} characters)", label, max_len));
    }

    Ok(())
}

/// Validate an optional free-text field
pub fn validate_optional_len(value: &str, label: &str, max_len: usize) -> Result<(), String> {
    if value.chars().count() > max_len {
        return Err(format!("{} is too long (max {} characters)", label, max_len));
    }
    Ok(())
}

/// Validate a star rating. Out-of-range values are rejected, not clamped.
pub fn validate_rating(rating: i64) -> Result<(), String> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(format!(
            "Rating must be between {} and {}",
            MIN_RATING, MAX_RATING
        ));
    }
    Ok(())
}

/// Validate review text
pub fn validate_review_content(content: &str) -> Result<(), String> {
    validate_required(content, "Review content", MAX_CONTENT_LEN)
}

/// Validate an image URL (optional field)
pub fn validate_image_url(url: &Option<String>) -> Result<(), String> {
    if let Some(u) = url {
        if u.is_empty() {
            return Ok(()); // Empty string treated as no image
        }

        if u.len() > 2048 {
            return Err("Image URL is too long (max 2048 characters)".to_string());
        }

        if !HTTP_URL_REGEX.is_match(u) {
            return Err("Image URL must be an http(s) URL".to_string());
        }
    }

    Ok(())
}
