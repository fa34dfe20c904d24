use actix_web::HttpResponse;
use uuid::Uuid;
use crate::models::models::User;
use crate::core::db::{find_user_by_email, update_list, Store};
use crate::core::errors::ApiError;
use crate::core::helpers::{gravatar_url, hash_password, now_iso, sanitize_string_fields};
use crate::validation::validate_register_input;

// Public view of a user, never includes the password hash
pub fn build_user_json(user: &User) -> serde_json::Value {
    serde_json::json!({
        "id": user.id,
        "name": user.name,
        "email": user.email,
        "avatar": user.avatar,
        "date": user.date,
    })
}

pub fn register_user(store: &Store, body: &[u8]) -> anyhow::Result<HttpResponse> {
    let mut new_user: serde_json::Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(_) => return Ok(ApiError::BadRequest("Invalid request body".to_string()).into()),
    };

    // Strip tags before the name bounds are checked
    sanitize_string_fields(&mut new_user, &["name"]);

    let errors = validate_register_input(&new_user);
    if !errors.is_valid() {
        return Ok(ApiError::Validation(errors).into());
    }

    let email = new_user["email"].as_str().unwrap_or_default().trim().to_string();
    let password = new_user["password"].as_str().unwrap_or_default();

    // Display name falls back to the mailbox part of the email
    let name = match new_user["name"].as_str().map(str::trim).filter(|s| !s.is_empty()) {
        Some(name) => name.to_string(),
        None => email.split('@').next().unwrap_or_default().to_string(),
    };

    // Check duplicate email
    if find_user_by_email(store, &email)?.is_some() {
        return Ok(ApiError::Conflict("email", "Email already exists".to_string()).into());
    }

    let id = Uuid::new_v4().to_string();

    let user = User {
        id: id.clone(),
        name,
        email: email.clone(),
        password: hash_password(password)?,
        avatar: Some(gravatar_url(&email)),
        date: now_iso(),
    };

    store.set_json(&format!("user:{}", id), &user)?;

    // Add to users_list
    update_list(store, "users_list", |users| users.push(id.clone()))?;

    Ok(HttpResponse::Ok().json(build_user_json(&user)))
}
