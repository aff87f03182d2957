//! Input validation for API requests.
//!
//! Field validators return `Err(message)` and are collected with
//! [`ValidationErrorBuilder`](super::error::ValidationErrorBuilder).

use lazy_static::lazy_static;
use regex::Regex;

use crate::db::{GUEST_CATEGORIES, SUPPORTED_LANGUAGES};

lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9-]+(\.[a-zA-Z0-9-]+)*\.[a-zA-Z]{2,}$"
    ).unwrap();

    /// Hex colors like `#D4B08C`
    static ref COLOR_REGEX: Regex = Regex::new(r"^#[0-9a-fA-F]{6}$").unwrap();

    /// 24-hour clock time, `HH:MM`
    static ref TIME_REGEX: Regex = Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").unwrap();

    /// Digits with optional leading `+`, spaces, dashes and parentheses
    static ref PHONE_REGEX: Regex = Regex::new(r"^\+?[0-9 ()-]{5,20}$").unwrap();

    static ref URL_REGEX: Regex = Regex::new(
        r"^https?://[a-zA-Z0-9][-a-zA-Z0-9]*(\.[a-zA-Z0-9][-a-zA-Z0-9]*)*(:\d+)?(/\S*)?$"
    ).unwrap();
}

const MAX_NAME_LEN: usize = 100;
const MAX_MESSAGE_LEN: usize = 2000;
const MAX_STORY_LEN: usize = 10_000;

/// Validate a required person or item name
pub fn validate_name(value: &str, label: &str) -> Result<(), String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("{} is required", label));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(format!("{} is too long (max {} characters)", label, MAX_NAME_LEN));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }
    if email.len() > 254 {
        return Err("Email is too long (max 254 characters)".to_string());
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email format".to_string());
    }
    Ok(())
}

/// Validate an optional email (empty counts as absent)
pub fn validate_optional_email(email: &Option<String>) -> Result<(), String> {
    match email.as_deref() {
        Some(e) if !e.is_empty() => validate_email(e),
        _ => Ok(()),
    }
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters".to_string());
    }
    if password.len() > 128 {
        return Err("Password is too long (max 128 characters)".to_string());
    }
    if !password.chars().any(|c| c.is_alphabetic()) || !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one letter and one digit".to_string());
    }
    Ok(())
}

/// Validate a calendar date in `YYYY-MM-DD` form
pub fn validate_date(date: &str, label: &str) -> Result<(), String> {
    if date.is_empty() {
        return Err(format!("{} is required", label));
    }
    chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| format!("{} must be a date in YYYY-MM-DD format", label))
}

pub fn validate_optional_date(date: &Option<String>, label: &str) -> Result<(), String> {
    match date {
        Some(d) => validate_date(d, label),
        None => Ok(()),
    }
}

pub fn validate_time(time: &Option<String>) -> Result<(), String> {
    match time.as_deref() {
        Some(t) if !t.is_empty() && !TIME_REGEX.is_match(t) => {
            Err("Time must be in HH:MM format".to_string())
        }
        _ => Ok(()),
    }
}

pub fn validate_color(color: &str) -> Result<(), String> {
    if !COLOR_REGEX.is_match(color) {
        return Err("Color must be a hex value like #D4B08C".to_string());
    }
    Ok(())
}

pub fn validate_optional_color(color: &Option<String>) -> Result<(), String> {
    match color {
        Some(c) => validate_color(c),
        None => Ok(()),
    }
}

/// Validate a required http(s) URL
pub fn validate_url(url: &str) -> Result<(), String> {
    if url.is_empty() {
        return Err("URL is required".to_string());
    }
    if url.len() > 2048 {
        return Err("URL is too long (max 2048 characters)".to_string());
    }
    if !URL_REGEX.is_match(url) {
        return Err("URL must start with http:// or https://".to_string());
    }
    Ok(())
}

pub fn validate_optional_url(url: &Option<String>) -> Result<(), String> {
    match url.as_deref() {
        Some(u) if !u.is_empty() => validate_url(u),
        _ => Ok(()),
    }
}

pub fn validate_phone(phone: &Option<String>) -> Result<(), String> {
    match phone.as_deref() {
        Some(p) if !p.is_empty() && !PHONE_REGEX.is_match(p) => {
            Err("Invalid phone number format".to_string())
        }
        _ => Ok(()),
    }
}

pub fn validate_message(message: &str, label: &str) -> Result<(), String> {
    if message.trim().is_empty() {
        return Err(format!("{} is required", label));
    }
    validate_optional_text(&Some(message.to_string()), label, MAX_MESSAGE_LEN)
}

pub fn validate_story(story: &Option<String>) -> Result<(), String> {
    validate_optional_text(story, "Story", MAX_STORY_LEN)
}

pub fn validate_optional_text(text: &Option<String>, label: &str, max: usize) -> Result<(), String> {
    match text {
        Some(t) if t.chars().count() > max => {
            Err(format!("{} is too long (max {} characters)", label, max))
        }
        _ => Ok(()),
    }
}

pub fn validate_guest_category(category: &str) -> Result<(), String> {
    if !GUEST_CATEGORIES.contains(&category) {
        return Err(format!(
            "Invalid category. Must be one of: {}",
            GUEST_CATEGORIES.join(", ")
        ));
    }
    Ok(())
}

/// Largest accepted amount, in minor currency units
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;

/// Amounts are minor currency units between 0 and `MAX_AMOUNT`
pub fn validate_amount(amount: Option<i64>, label: &str) -> Result<(), String> {
    match amount {
        Some(a) if a < 0 => Err(format!("{} cannot be negative", label)),
        Some(a) if a > MAX_AMOUNT => Err(format!("{} is too large (max {})", label, MAX_AMOUNT)),
        _ => Ok(()),
    }
}

/// Validate a language selection: a non-empty subset of the supported
/// languages that contains the default
pub fn validate_languages(default_language: &str, available: &[String]) -> Result<(), String> {
    if available.is_empty() {
        return Err("At least one language must be available".to_string());
    }
    if let Some(unknown) = available
        .iter()
        .find(|l| !SUPPORTED_LANGUAGES.contains(&l.as_str()))
    {
        return Err(format!(
            "Unsupported language '{}'. Must be one of: {}",
            unknown,
            SUPPORTED_LANGUAGES.join(", ")
        ));
    }
    if !available.iter().any(|l| l == default_language) {
        return Err("Default language must be one of the available languages".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Gulnora", "Bride name").is_ok());
        assert!(validate_name("   ", "Bride name").is_err());
        assert!(validate_name(&"x".repeat(101), "Bride name").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("couple@example.com").is_ok());
        assert!(validate_email("first.last+rsvp@mail.example.uz").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("a@b").is_err());
        assert!(validate_optional_email(&Some(String::new())).is_ok());
        assert!(validate_optional_email(&None).is_ok());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("wedding2026").is_ok());
        assert!(validate_password("short1").is_err());
        assert!(validate_password("nodigitshere").is_err());
        assert!(validate_password("1234567890").is_err());
    }

    #[test]
    fn test_validate_date_and_time() {
        assert!(validate_date("2026-09-12", "Wedding date").is_ok());
        assert!(validate_date("2026-02-30", "Wedding date").is_err());
        assert!(validate_date("12/09/2026", "Wedding date").is_err());
        assert!(validate_time(&Some("17:30".to_string())).is_ok());
        assert!(validate_time(&Some("25:00".to_string())).is_err());
        assert!(validate_time(&None).is_ok());
    }

    #[test]
    fn test_validate_color() {
        assert!(validate_color("#D4B08C").is_ok());
        assert!(validate_color("#89916b").is_ok());
        assert!(validate_color("D4B08C").is_err());
        assert!(validate_color("#FFF").is_err());
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://cdn.example.com/photos/1.jpg").is_ok());
        assert!(validate_url("http://localhost:5000/a.png").is_ok());
        assert!(validate_url("ftp://example.com/a.jpg").is_err());
        assert!(validate_url("javascript:alert(1)").is_err());
        assert!(validate_optional_url(&Some(String::new())).is_ok());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone(&Some("+998 90 123-45-67".to_string())).is_ok());
        assert!(validate_phone(&Some("call me".to_string())).is_err());
    }

    #[test]
    fn test_validate_languages() {
        let langs = vec!["uz".to_string(), "ru".to_string()];
        assert!(validate_languages("uz", &langs).is_ok());
        assert!(validate_languages("en", &langs).is_err());
        assert!(validate_languages("en", &[]).is_err());
        assert!(validate_languages("en", &["en".to_string(), "fr".to_string()]).is_err());
    }

    #[test]
    fn test_validate_guest_category_and_amount() {
        assert!(validate_guest_category("friends").is_ok());
        assert!(validate_guest_category("enemies").is_err());
        assert!(validate_amount(Some(0), "Estimated cost").is_ok());
        assert!(validate_amount(Some(-1), "Estimated cost").is_err());
        assert!(validate_amount(None, "Estimated cost").is_ok());
        assert!(validate_amount(Some(MAX_AMOUNT), "Estimated cost").is_ok());
        assert!(validate_amount(Some(MAX_AMOUNT + 1), "Estimated cost").is_err());
        assert!(validate_amount(Some(i64::MAX), "Actual cost").is_err());
    }
}
