use actix_web::{HttpRequest, HttpResponse};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use crate::models::models::User;
use crate::config::{jwt_secret, token_ttl_seconds};
use crate::core::db::{find_user_by_email, Store};
use crate::core::errors::ApiError;
use crate::core::helpers::verify_password;
use crate::users::build_user_json;
use crate::validation::validate_login_input;

/// Identity claims baked into every issued token. `iat` and `exp` are unix
/// timestamps; the rest is display identity the client may decode freely.
#[derive(Serialize, Deserialize)]
pub struct Claims {
    pub id: String,
    pub name: String,
    pub avatar: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

pub fn create_token(user: &User, secret: &[u8], ttl_seconds: i64) -> anyhow::Result<String> {
    let now = chrono::Utc::now();
    let claims = Claims {
        id: user.id.clone(),
        name: user.name.clone(),
        avatar: user.avatar.clone(),
        iat: now.timestamp(),
        exp: (now + chrono::Duration::seconds(ttl_seconds)).timestamp(),
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
        .map_err(|e| anyhow::anyhow!("Failed to sign token: {}", e))
}

pub fn verify_token(token: &str, secret: &[u8]) -> Option<Claims> {
    decode::<Claims>(token, &DecodingKey::from_secret(secret), &Validation::default())
        .map(|data| data.claims)
        .ok()
}

/// Bearer guard for private routes. Returns the decoded claims only when the
/// header carries a valid unexpired token whose user still exists.
pub fn authenticate(store: &Store, req: &HttpRequest) -> Option<Claims> {
    let auth_header = req.headers().get("Authorization")?.to_str().ok()?;
    if !auth_header.starts_with("Bearer ") {
        return None;
    }
    let token = auth_header.strip_prefix("Bearer ").unwrap();
    let claims = verify_token(token, jwt_secret().as_bytes())?;

    // Check if user still exists
    let user_key = format!("user:{}", claims.id);
    if store.get_json::<User>(&user_key).ok()?.is_none() {
        return None;
    }
    Some(claims)
}

pub fn login_user(store: &Store, body: &[u8]) -> anyhow::Result<HttpResponse> {
    let creds: serde_json::Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(_) => return Ok(ApiError::BadRequest("Invalid request body".to_string()).into()),
    };

    let errors = validate_login_input(&creds);
    if !errors.is_valid() {
        return Ok(ApiError::Validation(errors).into());
    }

    let email = creds["email"].as_str().unwrap_or_default().trim();
    let password = creds["password"].as_str().unwrap_or_default();

    let user = match find_user_by_email(store, email)? {
        Some(u) => u,
        None => return Ok(invalid_credentials()),
    };
    if !verify_password(password, &user.password) {
        return Ok(invalid_credentials());
    }

    let token = create_token(&user, jwt_secret().as_bytes(), token_ttl_seconds())?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "token": format!("Bearer {}", token),
    })))
}

// Unknown email and wrong password must be indistinguishable
fn invalid_credentials() -> HttpResponse {
    ApiError::Conflict("login", "Invalid email or password".to_string()).into()
}

pub fn current_user(store: &Store, req: &HttpRequest) -> anyhow::Result<HttpResponse> {
    let claims = match authenticate(store, req) {
        Some(c) => c,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    match store.get_json::<User>(&format!("user:{}", claims.id))? {
        Some(user) => Ok(HttpResponse::Ok().json(build_user_json(&user))),
        None => Ok(ApiError::Unauthorized.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::helpers::now_iso;
    use uuid::Uuid;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4().to_string(),
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            password: "hash".to_string(),
            avatar: None,
            date: now_iso(),
        }
    }

    #[test]
    fn test_token_roundtrip() {
        let user = sample_user();
        let token = create_token(&user, b"s3cret", 3600).unwrap();
        let claims = verify_token(&token, b"s3cret").unwrap();
        assert_eq!(claims.id, user.id);
        assert_eq!(claims.name, user.name);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_token_rejects_wrong_secret() {
        let user = sample_user();
        let token = create_token(&user, b"s3cret", 3600).unwrap();
        assert!(verify_token(&token, b"other").is_none());
    }

    #[test]
    fn test_token_rejects_tampering() {
        let user = sample_user();
        let mut token = create_token(&user, b"s3cret", 3600).unwrap();
        let flipped = if token.ends_with('Q') { 'A' } else { 'Q' };
        token.pop();
        token.push(flipped);
        assert!(verify_token(&token, b"s3cret").is_none());
    }

    #[test]
    fn test_token_expires() {
        let user = sample_user();
        // Already two hours past expiry, well beyond validation leeway
        let token = create_token(&user, b"s3cret", -7200).unwrap();
        assert!(verify_token(&token, b"s3cret").is_none());
    }
}
