pub mod auth;
pub mod config;
pub mod core;
pub mod models;
pub mod posts;
pub mod profiles;
pub mod users;
pub mod validation;

use actix_web::{web, HttpRequest, HttpResponse};

use crate::core::db::Store;

/// State shared across workers: the document store handle.
pub struct AppState {
    pub store: Store,
}

/// Catch-all dispatcher. Routes on (method, path); handler failures become a
/// JSON 500 so internals never leak into responses.
pub async fn handle(req: HttpRequest, body: web::Bytes, data: web::Data<AppState>) -> HttpResponse {
    let store = &data.store;
    let path = req.path().to_string();
    let method = req.method().as_str();

    let result = match (method, path.as_str()) {
        ("POST", "/api/users/register") => users::register_user(store, &body),
        ("POST", "/api/users/login") => auth::login_user(store, &body),
        ("GET", "/api/users/current") => auth::current_user(store, &req),
        ("GET", "/api/posts") => posts::list_posts(store),
        ("POST", "/api/posts") => posts::create_post(store, &req, &body),
        ("POST", p) if p.starts_with("/api/posts/like/") => posts::like_post(store, &req, p),
        ("POST", p) if p.starts_with("/api/posts/unlike/") => posts::unlike_post(store, &req, p),
        ("POST", p) if p.starts_with("/api/posts/comment/") => {
            posts::add_comment(store, &req, p, &body)
        }
        ("DELETE", p) if p.starts_with("/api/posts/comment/") => {
            posts::delete_comment(store, &req, p)
        }
        ("DELETE", p) if p.starts_with("/api/posts/") => posts::delete_post(store, &req, p),
        ("GET", p) if p.starts_with("/api/posts/") => posts::get_post(store, p),
        ("GET", "/api/profile") => profiles::current_profile(store, &req),
        ("POST", "/api/profile") => profiles::upsert_profile(store, &req, &body),
        ("DELETE", "/api/profile") => profiles::delete_account(store, &req),
        ("GET", "/api/profile/all") => profiles::list_profiles(store),
        ("GET", p) if p.starts_with("/api/profile/handle/") => profiles::profile_by_handle(store, p),
        ("GET", p) if p.starts_with("/api/profile/user/") => profiles::profile_by_user(store, p),
        ("POST", "/api/profile/experience") => profiles::add_experience(store, &req, &body),
        ("POST", "/api/profile/education") => profiles::add_education(store, &req, &body),
        ("DELETE", p) if p.starts_with("/api/profile/experience/") => {
            profiles::delete_experience(store, &req, p)
        }
        ("DELETE", p) if p.starts_with("/api/profile/education/") => {
            profiles::delete_education(store, &req, p)
        }
        _ => {
            return HttpResponse::NotFound().json(serde_json::json!({"error": "No route found"}))
        }
    };

    match result {
        Ok(response) => response,
        Err(err) => {
            log::error!("{} {} failed: {}", method, path, err);
            HttpResponse::InternalServerError()
                .json(serde_json::json!({"error": "Internal server error"}))
        }
    }
}
