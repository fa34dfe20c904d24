use actix_web::{HttpRequest, HttpResponse};
use uuid::Uuid;
use crate::models::models::{Comment, Like, Post};
use crate::core::db::{all_posts, update_list, Store};
use crate::core::errors::ApiError;
use crate::core::helpers::{now_iso, sanitize_string_fields, validate_uuid};
use crate::auth::authenticate;
use crate::validation::{validate_comment_input, validate_post_input};

pub fn list_posts(store: &Store) -> anyhow::Result<HttpResponse> {
    let posts = all_posts(store)?;
    Ok(HttpResponse::Ok().json(&posts))
}

pub fn get_post(store: &Store, path: &str) -> anyhow::Result<HttpResponse> {
    let post_id = path.trim_start_matches("/api/posts/");

    if post_id.is_empty() || !validate_uuid(post_id) {
        return Ok(ApiError::NotFound("nopost", "There is no post with that ID".to_string()).into());
    }

    match store.get_json::<Post>(&format!("post:{}", post_id))? {
        Some(post) => Ok(HttpResponse::Ok().json(&post)),
        None => Ok(ApiError::NotFound("nopost", "There is no post with that ID".to_string()).into()),
    }
}

pub fn create_post(store: &Store, req: &HttpRequest, body: &[u8]) -> anyhow::Result<HttpResponse> {
    let user = match authenticate(store, req) {
        Some(claims) => claims,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let mut value: serde_json::Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(_) => return Ok(ApiError::BadRequest("Invalid request body".to_string()).into()),
    };

    // Strip tags before the length bounds are checked
    sanitize_string_fields(&mut value, &["text"]);

    let errors = validate_post_input(&value);
    if !errors.is_valid() {
        return Ok(ApiError::Validation(errors).into());
    }

    let text = value["text"].as_str().unwrap_or_default().trim();
    let id = Uuid::new_v4().to_string();

    let post = Post {
        id: id.clone(),
        user: user.id.clone(),
        text: text.to_string(),
        name: user.name.clone(),
        avatar: user.avatar.clone(),
        likes: Vec::new(),
        comments: Vec::new(),
        date: now_iso(),
    };

    // Save post object
    store.set_json(&format!("post:{}", id), &post)?;

    // Prepend to the global feed (IDs in a JSON list, newest first)
    update_list(store, "feed", |feed| feed.insert(0, id.clone()))?;

    Ok(HttpResponse::Ok().json(&post))
}

pub fn delete_post(store: &Store, req: &HttpRequest, path: &str) -> anyhow::Result<HttpResponse> {
    let user = match authenticate(store, req) {
        Some(claims) => claims,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let post_id = path.trim_start_matches("/api/posts/");
    if post_id.is_empty() || !validate_uuid(post_id) {
        return Ok(ApiError::NotFound("postnotfound", "There is no post".to_string()).into());
    }

    let post_key = format!("post:{}", post_id);

    // Check if post exists and belongs to user
    match store.get_json::<Post>(&post_key)? {
        Some(post) => {
            if post.user != user.id {
                return Ok(
                    ApiError::Denied("noauthorized", "User not authorized".to_string()).into(),
                );
            }

            store.delete(&post_key)?;

            // Remove from feed
            update_list(store, "feed", |feed| feed.retain(|id| id != post_id))?;

            Ok(HttpResponse::Ok().json(serde_json::json!({"success": true})))
        }
        None => Ok(ApiError::NotFound("postnotfound", "There is no post".to_string()).into()),
    }
}

pub fn like_post(store: &Store, req: &HttpRequest, path: &str) -> anyhow::Result<HttpResponse> {
    let user = match authenticate(store, req) {
        Some(claims) => claims,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let post_id = path.trim_start_matches("/api/posts/like/");
    if post_id.is_empty() || !validate_uuid(post_id) {
        return Ok(ApiError::NotFound("postnotfound", "No post found".to_string()).into());
    }

    let post_key = format!("post:{}", post_id);

    // Read-check-write under a version so two racing likes cannot collapse
    // into one
    let updated = loop {
        let (mut post, version) = match store.get_json_versioned::<Post>(&post_key)? {
            Some(found) => found,
            None => {
                return Ok(ApiError::NotFound("postnotfound", "No post found".to_string()).into())
            }
        };

        if post.likes.iter().any(|like| like.user == user.id) {
            return Ok(ApiError::Conflict(
                "alreadyliked",
                "User already liked this post".to_string(),
            )
            .into());
        }

        post.likes.insert(0, Like { user: user.id.clone() });

        if store.set_json_checked(&post_key, &post, version)? {
            break post;
        }
    };

    Ok(HttpResponse::Ok().json(&updated))
}

pub fn unlike_post(store: &Store, req: &HttpRequest, path: &str) -> anyhow::Result<HttpResponse> {
    let user = match authenticate(store, req) {
        Some(claims) => claims,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let post_id = path.trim_start_matches("/api/posts/unlike/");
    if post_id.is_empty() || !validate_uuid(post_id) {
        return Ok(ApiError::NotFound("postnotfound", "No post found".to_string()).into());
    }

    let post_key = format!("post:{}", post_id);

    let updated = loop {
        let (mut post, version) = match store.get_json_versioned::<Post>(&post_key)? {
            Some(found) => found,
            None => {
                return Ok(ApiError::NotFound("postnotfound", "No post found".to_string()).into())
            }
        };

        if !post.likes.iter().any(|like| like.user == user.id) {
            return Ok(ApiError::Conflict(
                "notliked",
                "You have not yet liked this post".to_string(),
            )
            .into());
        }

        post.likes.retain(|like| like.user != user.id);

        if store.set_json_checked(&post_key, &post, version)? {
            break post;
        }
    };

    Ok(HttpResponse::Ok().json(&updated))
}

pub fn add_comment(
    store: &Store,
    req: &HttpRequest,
    path: &str,
    body: &[u8],
) -> anyhow::Result<HttpResponse> {
    let user = match authenticate(store, req) {
        Some(claims) => claims,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let post_id = path.trim_start_matches("/api/posts/comment/");
    if post_id.is_empty() || !validate_uuid(post_id) {
        return Ok(ApiError::NotFound("postnotfound", "No post found".to_string()).into());
    }

    let mut value: serde_json::Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(_) => return Ok(ApiError::BadRequest("Invalid request body".to_string()).into()),
    };

    // Strip tags before the length bounds are checked
    sanitize_string_fields(&mut value, &["text"]);

    let errors = validate_comment_input(&value);
    if !errors.is_valid() {
        return Ok(ApiError::Validation(errors).into());
    }

    let text = value["text"].as_str().unwrap_or_default().trim();
    let post_key = format!("post:{}", post_id);

    let updated = loop {
        let (mut post, version) = match store.get_json_versioned::<Post>(&post_key)? {
            Some(found) => found,
            None => {
                return Ok(ApiError::NotFound("postnotfound", "No post found".to_string()).into())
            }
        };

        let comment = Comment {
            id: Uuid::new_v4().to_string(),
            user: user.id.clone(),
            text: text.to_string(),
            name: user.name.clone(),
            avatar: user.avatar.clone(),
            date: now_iso(),
        };
        post.comments.insert(0, comment); // prepend newest

        if store.set_json_checked(&post_key, &post, version)? {
            break post;
        }
    };

    Ok(HttpResponse::Ok().json(&updated))
}

pub fn delete_comment(store: &Store, req: &HttpRequest, path: &str) -> anyhow::Result<HttpResponse> {
    let user = match authenticate(store, req) {
        Some(claims) => claims,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let rest = path.trim_start_matches("/api/posts/comment/");
    let mut parts = rest.splitn(2, '/');
    let post_id = parts.next().unwrap_or_default();
    let comment_id = parts.next().unwrap_or_default();

    if post_id.is_empty() || !validate_uuid(post_id) {
        return Ok(ApiError::NotFound("postnotfound", "Post not found".to_string()).into());
    }
    if comment_id.is_empty() {
        return Ok(
            ApiError::NotFound("commentnotexist", "Comment does not exist".to_string()).into(),
        );
    }

    let post_key = format!("post:{}", post_id);

    let updated = loop {
        let (mut post, version) = match store.get_json_versioned::<Post>(&post_key)? {
            Some(found) => found,
            None => {
                return Ok(ApiError::NotFound("postnotfound", "Post not found".to_string()).into())
            }
        };

        let comment = match post.comments.iter().find(|c| c.id == comment_id) {
            Some(c) => c,
            None => {
                return Ok(ApiError::NotFound(
                    "commentnotexist",
                    "Comment does not exist".to_string(),
                )
                .into())
            }
        };

        // Only the comment author may remove it
        if comment.user != user.id {
            return Ok(ApiError::Denied("noauthorized", "User not authorized".to_string()).into());
        }

        post.comments.retain(|c| c.id != comment_id);

        if store.set_json_checked(&post_key, &post, version)? {
            break post;
        }
    };

    Ok(HttpResponse::Ok().json(&updated))
}
