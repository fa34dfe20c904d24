use actix_web::{HttpRequest, HttpResponse};
use uuid::Uuid;
use crate::models::models::{Education, Experience, Profile, User};
use crate::core::db::{all_profiles, find_profile_by_handle, update_list, Store};
use crate::core::errors::ApiError;
use crate::core::helpers::{now_iso, sanitize_string_fields, validate_uuid};
use crate::auth::authenticate;
use crate::validation::{
    validate_education_input, validate_experience_input, validate_profile_input,
};

// Profile with its owner attached as {id, name, avatar}, the shape every
// profile route responds with
fn profile_json(store: &Store, profile: &Profile) -> anyhow::Result<serde_json::Value> {
    let owner = match store.get_json::<User>(&format!("user:{}", profile.user))? {
        Some(u) => serde_json::json!({
            "id": u.id,
            "name": u.name,
            "avatar": u.avatar,
        }),
        None => serde_json::Value::Null,
    };

    let mut value = serde_json::to_value(profile)?;
    value["user"] = owner;
    Ok(value)
}

fn opt_field(data: &serde_json::Value, field: &str) -> Option<String> {
    data.get(field)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn current_profile(store: &Store, req: &HttpRequest) -> anyhow::Result<HttpResponse> {
    let user = match authenticate(store, req) {
        Some(claims) => claims,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    match store.get_json::<Profile>(&format!("profile:{}", user.id))? {
        Some(profile) => Ok(HttpResponse::Ok().json(profile_json(store, &profile)?)),
        None => Ok(ApiError::NotFound(
            "noprofile",
            "There is no profile for this user".to_string(),
        )
        .into()),
    }
}

pub fn list_profiles(store: &Store) -> anyhow::Result<HttpResponse> {
    let profiles = all_profiles(store)?;
    if profiles.is_empty() {
        return Ok(ApiError::NotFound("noprofile", "There are no profiles".to_string()).into());
    }

    let mut out = Vec::with_capacity(profiles.len());
    for profile in &profiles {
        out.push(profile_json(store, profile)?);
    }
    Ok(HttpResponse::Ok().json(&out))
}

pub fn profile_by_handle(store: &Store, path: &str) -> anyhow::Result<HttpResponse> {
    let handle = path.trim_start_matches("/api/profile/handle/");

    match find_profile_by_handle(store, handle)? {
        Some(profile) => Ok(HttpResponse::Ok().json(profile_json(store, &profile)?)),
        None => Ok(ApiError::NotFound(
            "noprofile",
            "There is no profile for this user".to_string(),
        )
        .into()),
    }
}

pub fn profile_by_user(store: &Store, path: &str) -> anyhow::Result<HttpResponse> {
    let user_id = path.trim_start_matches("/api/profile/user/");

    if user_id.is_empty() || !validate_uuid(user_id) {
        return Ok(
            ApiError::NotFound("profile", "There is no profile for this user".to_string()).into(),
        );
    }

    match store.get_json::<Profile>(&format!("profile:{}", user_id))? {
        Some(profile) => Ok(HttpResponse::Ok().json(profile_json(store, &profile)?)),
        None => Ok(
            ApiError::NotFound("profile", "There is no profile for this user".to_string()).into(),
        ),
    }
}

pub fn upsert_profile(store: &Store, req: &HttpRequest, body: &[u8]) -> anyhow::Result<HttpResponse> {
    let user = match authenticate(store, req) {
        Some(claims) => claims,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let mut value: serde_json::Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(_) => return Ok(ApiError::BadRequest("Invalid request body".to_string()).into()),
    };

    // Strip tags before the handle bounds are checked
    sanitize_string_fields(&mut value, &["handle", "status", "bio"]);

    let errors = validate_profile_input(&value);
    if !errors.is_valid() {
        return Ok(ApiError::Validation(errors).into());
    }

    let handle = value["handle"].as_str().unwrap_or_default().trim();
    let status = value["status"].as_str().unwrap_or_default().trim();

    // Handle must stay unique across other users, on create and update alike
    if let Some(existing) = find_profile_by_handle(store, handle)? {
        if existing.user != user.id {
            return Ok(
                ApiError::Conflict("handle", "That handle already exists".to_string()).into(),
            );
        }
    }

    // Skills arrive comma separated
    let skills: Vec<String> = value["skills"]
        .as_str()
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let profile_key = format!("profile:{}", user.id);
    let previous = store.get_json::<Profile>(&profile_key)?;

    // Experience and education survive profile edits untouched
    let (experience, education, date) = match &previous {
        Some(p) => (p.experience.clone(), p.education.clone(), p.date.clone()),
        None => (Vec::new(), Vec::new(), now_iso()),
    };

    let profile = Profile {
        user: user.id.clone(),
        handle: handle.to_string(),
        company: opt_field(&value, "company"),
        website: opt_field(&value, "website"),
        location: opt_field(&value, "location"),
        status: status.to_string(),
        skills,
        bio: opt_field(&value, "bio"),
        githubusername: opt_field(&value, "githubusername"),
        experience,
        education,
        date,
    };

    store.set_json(&profile_key, &profile)?;

    if previous.is_none() {
        update_list(store, "profiles_list", |profiles| {
            if !profiles.contains(&user.id) {
                profiles.push(user.id.clone());
            }
        })?;
    }

    Ok(HttpResponse::Ok().json(profile_json(store, &profile)?))
}

pub fn add_experience(store: &Store, req: &HttpRequest, body: &[u8]) -> anyhow::Result<HttpResponse> {
    let user = match authenticate(store, req) {
        Some(claims) => claims,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let mut value: serde_json::Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(_) => return Ok(ApiError::BadRequest("Invalid request body".to_string()).into()),
    };

    // Strip tags before the required-field checks
    sanitize_string_fields(&mut value, &["title", "company", "location", "description"]);

    let errors = validate_experience_input(&value);
    if !errors.is_valid() {
        return Ok(ApiError::Validation(errors).into());
    }

    let profile_key = format!("profile:{}", user.id);
    let mut profile = match store.get_json::<Profile>(&profile_key)? {
        Some(p) => p,
        None => {
            return Ok(ApiError::NotFound(
                "noprofile",
                "There is no profile for this user".to_string(),
            )
            .into())
        }
    };

    let entry = Experience {
        id: Uuid::new_v4().to_string(),
        title: value["title"].as_str().unwrap_or_default().trim().to_string(),
        company: value["company"].as_str().unwrap_or_default().trim().to_string(),
        location: value["location"].as_str().unwrap_or_default().trim().to_string(),
        from: value["from"].as_str().unwrap_or_default().trim().to_string(),
        to: opt_field(&value, "to"),
        current: value["current"].as_bool().unwrap_or(false),
        description: opt_field(&value, "description"),
    };
    profile.experience.insert(0, entry); // prepend newest

    store.set_json(&profile_key, &profile)?;

    Ok(HttpResponse::Ok().json(profile_json(store, &profile)?))
}

pub fn add_education(store: &Store, req: &HttpRequest, body: &[u8]) -> anyhow::Result<HttpResponse> {
    let user = match authenticate(store, req) {
        Some(claims) => claims,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let mut value: serde_json::Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(_) => return Ok(ApiError::BadRequest("Invalid request body".to_string()).into()),
    };

    // Strip tags before the required-field checks
    sanitize_string_fields(&mut value, &["school", "degree", "fieldofstudy", "description"]);

    let errors = validate_education_input(&value);
    if !errors.is_valid() {
        return Ok(ApiError::Validation(errors).into());
    }

    let profile_key = format!("profile:{}", user.id);
    let mut profile = match store.get_json::<Profile>(&profile_key)? {
        Some(p) => p,
        None => {
            return Ok(ApiError::NotFound(
                "noprofile",
                "There is no profile for this user".to_string(),
            )
            .into())
        }
    };

    let entry = Education {
        id: Uuid::new_v4().to_string(),
        school: value["school"].as_str().unwrap_or_default().trim().to_string(),
        degree: opt_field(&value, "degree"),
        fieldofstudy: value["fieldofstudy"].as_str().unwrap_or_default().trim().to_string(),
        from: value["from"].as_str().unwrap_or_default().trim().to_string(),
        to: opt_field(&value, "to"),
        current: value["current"].as_bool().unwrap_or(false),
        description: opt_field(&value, "description"),
    };
    profile.education.insert(0, entry); // prepend newest

    store.set_json(&profile_key, &profile)?;

    Ok(HttpResponse::Ok().json(profile_json(store, &profile)?))
}

pub fn delete_experience(store: &Store, req: &HttpRequest, path: &str) -> anyhow::Result<HttpResponse> {
    let user = match authenticate(store, req) {
        Some(claims) => claims,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let exp_id = path.trim_start_matches("/api/profile/experience/");

    let profile_key = format!("profile:{}", user.id);
    let mut profile = match store.get_json::<Profile>(&profile_key)? {
        Some(p) => p,
        None => {
            return Ok(ApiError::NotFound(
                "noprofile",
                "There is no profile for this user".to_string(),
            )
            .into())
        }
    };

    if exp_id.is_empty()
        || !validate_uuid(exp_id)
        || !profile.experience.iter().any(|e| e.id == exp_id)
    {
        return Ok(ApiError::NotFound(
            "experiencenotfound",
            "Experience entry not found".to_string(),
        )
        .into());
    }

    profile.experience.retain(|e| e.id != exp_id);
    store.set_json(&profile_key, &profile)?;

    Ok(HttpResponse::Ok().json(profile_json(store, &profile)?))
}

pub fn delete_education(store: &Store, req: &HttpRequest, path: &str) -> anyhow::Result<HttpResponse> {
    let user = match authenticate(store, req) {
        Some(claims) => claims,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let edu_id = path.trim_start_matches("/api/profile/education/");

    let profile_key = format!("profile:{}", user.id);
    let mut profile = match store.get_json::<Profile>(&profile_key)? {
        Some(p) => p,
        None => {
            return Ok(ApiError::NotFound(
                "noprofile",
                "There is no profile for this user".to_string(),
            )
            .into())
        }
    };

    if edu_id.is_empty()
        || !validate_uuid(edu_id)
        || !profile.education.iter().any(|e| e.id == edu_id)
    {
        return Ok(ApiError::NotFound(
            "educationnotfound",
            "Education entry not found".to_string(),
        )
        .into());
    }

    profile.education.retain(|e| e.id != edu_id);
    store.set_json(&profile_key, &profile)?;

    Ok(HttpResponse::Ok().json(profile_json(store, &profile)?))
}

/// Remove the caller's profile and account. Their posts stay on the feed.
pub fn delete_account(store: &Store, req: &HttpRequest) -> anyhow::Result<HttpResponse> {
    let user = match authenticate(store, req) {
        Some(claims) => claims,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    store.delete(&format!("profile:{}", user.id))?;
    update_list(store, "profiles_list", |profiles| {
        profiles.retain(|id| id != &user.id)
    })?;

    store.delete(&format!("user:{}", user.id))?;
    update_list(store, "users_list", |users| {
        users.retain(|id| id != &user.id)
    })?;

    Ok(HttpResponse::Ok().json(serde_json::json!({"success": true})))
}
