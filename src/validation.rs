use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::config::*;

/// Field-keyed validation errors. Serializes as a flat `{field: message}`
/// object, which is exactly the 400 payload the client expects.
#[derive(Debug, Default, Serialize)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    pub fn is_valid(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    fn add(&mut self, field: &'static str, message: &str) {
        self.0.insert(field, message.to_string());
    }
}

// Length bounds are in characters, not bytes
fn char_len(s: &str) -> usize {
    s.chars().count()
}

// A field counts as absent when missing, non-string, or blank after trimming
fn text_field<'a>(data: &'a Value, field: &str) -> Option<&'a str> {
    data.get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn email_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Regex should compile")
    })
}

pub fn validate_register_input(data: &Value) -> FieldErrors {
    let mut errors = FieldErrors::default();

    match text_field(data, "email") {
        None => errors.add("email", "Email field is required"),
        Some(email) if !email_regex().is_match(email) => errors.add("email", "Email is invalid"),
        Some(_) => {}
    }

    match text_field(data, "password") {
        None => errors.add("password", "Password field is required"),
        Some(p) if char_len(p) < MIN_PASSWORD_LENGTH || char_len(p) > MAX_PASSWORD_LENGTH => {
            errors.add("password", "Password must be at least 6 characters")
        }
        Some(_) => {}
    }

    // Display name is optional at registration
    if let Some(name) = text_field(data, "name") {
        if char_len(name) < MIN_NAME_LENGTH || char_len(name) > MAX_NAME_LENGTH {
            errors.add("name", "Name must be between 2 and 30 characters");
        }
    }

    errors
}

pub fn validate_login_input(data: &Value) -> FieldErrors {
    let mut errors = FieldErrors::default();

    match text_field(data, "email") {
        None => errors.add("email", "Email field is required"),
        Some(email) if !email_regex().is_match(email) => errors.add("email", "Email is invalid"),
        Some(_) => {}
    }

    if text_field(data, "password").is_none() {
        errors.add("password", "Password field is required");
    }

    errors
}

pub fn validate_post_input(data: &Value) -> FieldErrors {
    let mut errors = FieldErrors::default();

    match text_field(data, "text") {
        None => errors.add("text", "Text field is required"),
        Some(text) if char_len(text) < MIN_POST_LENGTH || char_len(text) > MAX_POST_LENGTH => {
            errors.add("text", "Post must be between 10 and 300 characters")
        }
        Some(_) => {}
    }

    errors
}

// Comments share the post text rules
pub fn validate_comment_input(data: &Value) -> FieldErrors {
    validate_post_input(data)
}

pub fn validate_profile_input(data: &Value) -> FieldErrors {
    let mut errors = FieldErrors::default();

    match text_field(data, "handle") {
        None => errors.add("handle", "Profile handle is required"),
        Some(handle)
            if char_len(handle) < MIN_HANDLE_LENGTH || char_len(handle) > MAX_HANDLE_LENGTH =>
        {
            errors.add("handle", "Handle needs to be between 2 and 40 characters")
        }
        Some(_) => {}
    }

    if text_field(data, "status").is_none() {
        errors.add("status", "Status field is required");
    }

    if text_field(data, "skills").is_none() {
        errors.add("skills", "Skills field is required");
    }

    errors
}

pub fn validate_experience_input(data: &Value) -> FieldErrors {
    let mut errors = FieldErrors::default();

    if text_field(data, "title").is_none() {
        errors.add("title", "Job Title of experience is required");
    }
    if text_field(data, "company").is_none() {
        errors.add("company", "Company is required");
    }
    if text_field(data, "location").is_none() {
        errors.add("location", "Location is required");
    }
    if text_field(data, "from").is_none() {
        errors.add("from", "From is required");
    }

    errors
}

pub fn validate_education_input(data: &Value) -> FieldErrors {
    let mut errors = FieldErrors::default();

    if text_field(data, "school").is_none() {
        errors.add("school", "School is required");
    }
    if text_field(data, "fieldofstudy").is_none() {
        errors.add("fieldofstudy", "Field of study is required");
    }
    if text_field(data, "from").is_none() {
        errors.add("from", "From is required");
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_register_requires_email_and_password() {
        let errors = validate_register_input(&json!({}));
        assert!(!errors.is_valid());
        assert_eq!(errors.get("email"), Some("Email field is required"));
        assert_eq!(errors.get("password"), Some("Password field is required"));
    }

    #[test]
    fn test_register_whitespace_counts_as_missing() {
        let errors = validate_register_input(&json!({"email": "   ", "password": "\t"}));
        assert_eq!(errors.get("email"), Some("Email field is required"));
        assert_eq!(errors.get("password"), Some("Password field is required"));
    }

    #[test]
    fn test_register_rejects_bad_email() {
        let errors = validate_register_input(&json!({
            "email": "not-an-email",
            "password": "hunter22",
        }));
        assert_eq!(errors.get("email"), Some("Email is invalid"));
        assert!(errors.get("password").is_none());
    }

    #[test]
    fn test_register_password_bounds() {
        let errors = validate_register_input(&json!({
            "email": "dev@example.com",
            "password": "short",
        }));
        assert_eq!(
            errors.get("password"),
            Some("Password must be at least 6 characters")
        );

        let errors = validate_register_input(&json!({
            "email": "dev@example.com",
            "password": "x".repeat(31),
        }));
        assert!(errors.get("password").is_some());
    }

    #[test]
    fn test_register_name_optional_but_bounded() {
        let ok = validate_register_input(&json!({
            "email": "dev@example.com",
            "password": "hunter22",
        }));
        assert!(ok.is_valid());

        let errors = validate_register_input(&json!({
            "email": "dev@example.com",
            "password": "hunter22",
            "name": "x",
        }));
        assert_eq!(
            errors.get("name"),
            Some("Name must be between 2 and 30 characters")
        );
    }

    #[test]
    fn test_post_text_bounds() {
        assert!(validate_post_input(&json!({"text": "exactly 10"})).is_valid());
        assert!(validate_post_input(&json!({"text": "x".repeat(300)})).is_valid());

        let too_short = validate_post_input(&json!({"text": "too short"}));
        assert_eq!(
            too_short.get("text"),
            Some("Post must be between 10 and 300 characters")
        );

        let too_long = validate_post_input(&json!({"text": "x".repeat(301)}));
        assert!(!too_long.is_valid());

        let missing = validate_post_input(&json!({}));
        assert_eq!(missing.get("text"), Some("Text field is required"));
    }

    #[test]
    fn test_post_bounds_count_characters_not_bytes() {
        // Five characters, ten bytes: still too short
        let errors = validate_post_input(&json!({"text": "ééééé"}));
        assert_eq!(
            errors.get("text"),
            Some("Post must be between 10 and 300 characters")
        );

        // 300 characters, 600 bytes: still within bounds
        assert!(validate_post_input(&json!({"text": "é".repeat(300)})).is_valid());
    }

    #[test]
    fn test_password_and_handle_bounds_count_characters() {
        let errors = validate_register_input(&json!({
            "email": "dev@example.com",
            "password": "ééééé",
        }));
        assert_eq!(
            errors.get("password"),
            Some("Password must be at least 6 characters")
        );

        let ok = validate_profile_input(&json!({
            "handle": "é".repeat(40),
            "status": "Developer",
            "skills": "Rust",
        }));
        assert!(ok.is_valid());
    }

    #[test]
    fn test_post_text_must_be_a_string() {
        let errors = validate_post_input(&json!({"text": 1234567890}));
        assert_eq!(errors.get("text"), Some("Text field is required"));
    }

    #[test]
    fn test_profile_required_fields() {
        let errors = validate_profile_input(&json!({}));
        assert_eq!(errors.get("handle"), Some("Profile handle is required"));
        assert_eq!(errors.get("status"), Some("Status field is required"));
        assert_eq!(errors.get("skills"), Some("Skills field is required"));

        let ok = validate_profile_input(&json!({
            "handle": "ada",
            "status": "Developer",
            "skills": "Rust,SQL",
        }));
        assert!(ok.is_valid());
    }

    #[test]
    fn test_profile_handle_bounds() {
        let errors = validate_profile_input(&json!({
            "handle": "x",
            "status": "Developer",
            "skills": "Rust",
        }));
        assert_eq!(
            errors.get("handle"),
            Some("Handle needs to be between 2 and 40 characters")
        );

        let errors = validate_profile_input(&json!({
            "handle": "x".repeat(41),
            "status": "Developer",
            "skills": "Rust",
        }));
        assert!(!errors.is_valid());
    }

    #[test]
    fn test_experience_required_fields() {
        let errors = validate_experience_input(&json!({}));
        assert_eq!(errors.get("title"), Some("Job Title of experience is required"));
        assert_eq!(errors.get("company"), Some("Company is required"));
        assert_eq!(errors.get("location"), Some("Location is required"));
        assert_eq!(errors.get("from"), Some("From is required"));
    }

    #[test]
    fn test_education_required_fields() {
        let errors = validate_education_input(&json!({}));
        assert_eq!(errors.get("school"), Some("School is required"));
        assert_eq!(errors.get("fieldofstudy"), Some("Field of study is required"));
        assert_eq!(errors.get("from"), Some("From is required"));

        let ok = validate_education_input(&json!({
            "school": "MIT",
            "fieldofstudy": "CS",
            "from": "2019-09-01",
        }));
        assert!(ok.is_valid());
    }
}
