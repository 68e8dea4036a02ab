use http::StatusCode;
use spin_sdk::http::{Method, Request, Response};
use tracing::error;

use crate::core::errors::{ApiError, ApiResult};
use crate::core::helpers::json_response;
use crate::core::store::KeyValue;
use crate::{auth, follow, posts, profiles, users};

/// Dispatches one request. Every path accepts an optional trailing slash.
pub fn route(store: &dyn KeyValue, req: &Request) -> Response {
    let path = req.path();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let result = match (req.method(), segments.as_slice()) {
        (Method::Get, []) => api_root(),

        (Method::Post, ["users"]) => users::create_user(store, req),
        (Method::Get, ["users", "me"]) => users::get_current_user(store, req),
        (Method::Delete, ["users", "me"]) => users::delete_current_user(store, req),
        (Method::Post, ["login"]) => auth::login_user(store, req),
        (Method::Post, ["logout"]) => auth::logout_user(store, req),

        (Method::Get, ["profiles"]) => profiles::list_profiles(store, req),
        (Method::Post, ["profiles"]) => profiles::create_profile(store, req),
        (Method::Get, ["profiles", id]) => profiles::retrieve_profile(store, id),
        (Method::Put, ["profiles", id]) => profiles::update_profile(store, req, id, false),
        (Method::Patch, ["profiles", id]) => profiles::update_profile(store, req, id, true),
        (Method::Delete, ["profiles", id]) => profiles::destroy_profile(store, req, id),
        (Method::Post, ["profiles", id, "follow"]) => follow::handle_follow(store, req, id),
        (Method::Post, ["profiles", id, "unfollow"]) => follow::handle_unfollow(store, req, id),

        (Method::Get, ["posts"]) => posts::list_posts(store, req),
        (Method::Post, ["posts"]) => posts::create_post(store, req),
        (Method::Get, ["posts", id]) => posts::retrieve_post(store, id),
        (Method::Put, ["posts", id]) => posts::update_post(store, req, id, false),
        (Method::Patch, ["posts", id]) => posts::update_post(store, req, id, true),
        (Method::Delete, ["posts", id]) => posts::destroy_post(store, req, id),

        (method, segments) if is_known_path(segments) => {
            Err(ApiError::MethodNotAllowed(method.to_string()))
        }
        _ => Err(ApiError::NotFound("No route found".to_string())),
    };

    match result {
        Ok(resp) => resp,
        Err(err) => {
            if let ApiError::Internal(source) = &err {
                error!(method = %req.method(), path, "request failed: {:#}", source);
            }
            err.into()
        }
    }
}

fn is_known_path(segments: &[&str]) -> bool {
    matches!(
        segments,
        []
            | ["users"]
            | ["users", "me"]
            | ["login"]
            | ["logout"]
            | ["profiles"]
            | ["profiles", _]
            | ["profiles", _, "follow" | "unfollow"]
            | ["posts"]
            | ["posts", _]
    )
}

fn api_root() -> ApiResult {
    json_response(
        StatusCode::OK,
        &serde_json::json!({
            "profiles": "/profiles/",
            "posts": "/posts/",
        }),
    )
}
