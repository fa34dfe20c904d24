use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use argon2::password_hash::SaltString;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use uuid::Uuid;

pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::PasswordHash;

    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

pub fn validate_uuid(id: &str) -> bool {
    Uuid::parse_str(id).is_ok()
}

/// Gravatar URL for an email, using the SHA-256 digest form.
pub fn gravatar_url(email: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(email.trim().to_lowercase().as_bytes());
    format!(
        "https://www.gravatar.com/avatar/{:x}?s=200&r=pg&d=mm",
        hasher.finalize()
    )
}

/// Strip all HTML tags from user-supplied text.
pub fn sanitize_text(text: &str) -> String {
    ammonia::Builder::default()
        .tags(std::collections::HashSet::new())
        .clean(text)
        .to_string()
}

/// Strip tags from the named string fields of a request body, in place.
/// Handlers run this before validation so length and required-field rules
/// see the text as it will be stored.
pub fn sanitize_string_fields(value: &mut serde_json::Value, fields: &[&str]) {
    for field in fields {
        if let Some(cleaned) = value
            .get(*field)
            .and_then(serde_json::Value::as_str)
            .map(sanitize_text)
        {
            value[*field] = serde_json::Value::String(cleaned);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("hunter22").unwrap();
        assert_ne!(hash, "hunter22");
        assert!(verify_password("hunter22", &hash));
        assert!(!verify_password("hunter23", &hash));
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(!verify_password("hunter22", "not-a-phc-string"));
    }

    #[test]
    fn test_gravatar_normalizes_email() {
        let a = gravatar_url("Dev@Example.com");
        let b = gravatar_url("  dev@example.com  ");
        assert_eq!(a, b);
        assert!(a.starts_with("https://www.gravatar.com/avatar/"));
    }

    #[test]
    fn test_sanitize_strips_tags() {
        assert_eq!(
            sanitize_text("hello <script>alert(1)</script><b>world</b>"),
            "hello world"
        );
    }

    #[test]
    fn test_sanitize_fields_in_place() {
        let mut value = serde_json::json!({"handle": "<b>a</b>", "skills": "Rust"});
        sanitize_string_fields(&mut value, &["handle", "status"]);
        assert_eq!(value["handle"], "a");
        assert_eq!(value["skills"], "Rust");
    }
}
