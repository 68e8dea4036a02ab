use http::StatusCode;
use spin_sdk::http::Request;
use tracing::info;

use crate::auth::{require_user, revoke_user_tokens, Credentials};
use crate::config::*;
use crate::core::errors::{ApiError, ApiResult, FieldErrors};
use crate::core::helpers::{hash_password, json_response, new_id, no_content, now, parse_body};
use crate::core::store::{JsonStore, KeyValue};
use crate::follow::remove_from_followings;
use crate::models::User;
use crate::profiles::{delete_profile_cascade, load_profile_for_user};
use crate::serializers::UserSummary;

pub fn load_user(store: &dyn KeyValue, user_id: &str) -> anyhow::Result<Option<User>> {
    store.get_json::<User>(&user_key(user_id))
}

pub fn find_user_by_username(store: &dyn KeyValue, username: &str) -> anyhow::Result<Option<User>> {
    match store.get_json::<String>(&username_key(username))? {
        Some(id) => load_user(store, &id),
        None => Ok(None),
    }
}

/// Stores a new account, or returns `None` when the username is taken.
/// The caller is responsible for validation.
pub fn insert_user(store: &dyn KeyValue, username: &str, password: &str) -> anyhow::Result<Option<User>> {
    let user = User {
        id: new_id(),
        username: username.to_string(),
        password: hash_password(password)?,
        created_at: now(),
    };
    if !store.set_json_if_absent(&username_key(username), &user.id)? {
        return Ok(None);
    }
    store.set_json(&user_key(&user.id), &user)?;
    store.update_json(USERS_LIST_KEY, |users: &mut Vec<String>| users.push(user.id.clone()))?;

    Ok(Some(user))
}

fn validate_credentials(creds: &Credentials) -> Result<String, ApiError> {
    let mut errors = FieldErrors::new();
    let username = creds.username.trim();
    let username_len = username.chars().count();

    if username.is_empty() {
        errors.entry("username".into()).or_default().push("This field is required.".into());
    } else if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&username_len) {
        errors.entry("username".into()).or_default().push(format!(
            "Username must be {}-{} characters.",
            MIN_USERNAME_LENGTH, MAX_USERNAME_LENGTH
        ));
    }

    if creds.password.is_empty() {
        errors.entry("password".into()).or_default().push("This field is required.".into());
    } else if creds.password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.entry("password".into()).or_default().push(format!(
            "Password must be at least {} characters.",
            MIN_PASSWORD_LENGTH
        ));
    }

    if errors.is_empty() {
        Ok(username.to_string())
    } else {
        Err(ApiError::Validation(errors))
    }
}

// === HTTP Handlers ===

pub fn create_user(store: &dyn KeyValue, req: &Request) -> ApiResult {
    let creds: Credentials = parse_body(req)?;
    let username = validate_credentials(&creds)?;

    let user = insert_user(store, &username, &creds.password)?
        .ok_or_else(|| ApiError::Conflict("Username exists".to_string()))?;
    info!(user_id = %user.id, "user registered");

    json_response(StatusCode::CREATED, &UserSummary::from(&user))
}

pub fn get_current_user(store: &dyn KeyValue, req: &Request) -> ApiResult {
    let user_id = require_user(store, req)?;
    let user = load_user(store, &user_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    json_response(StatusCode::OK, &UserSummary::from(&user))
}

/// Deletes the requester's account together with everything hanging off it.
pub fn delete_current_user(store: &dyn KeyValue, req: &Request) -> ApiResult {
    let user_id = require_user(store, req)?;

    if let Some(profile) = load_profile_for_user(store, &user_id)? {
        delete_profile_cascade(store, &profile)?;
    }
    remove_from_followings(store, &user_id)?;
    revoke_user_tokens(store, &user_id)?;

    if let Some(user) = load_user(store, &user_id)? {
        store.delete(&username_key(&user.username))?;
    }
    store.delete(&user_key(&user_id))?;
    store.update_json(USERS_LIST_KEY, |users: &mut Vec<String>| users.retain(|id| id != &user_id))?;

    info!(user_id = %user_id, "user deleted");
    no_content()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::tests::{body_json, request, signup};
    use crate::core::store::MemoryStore;
    use crate::router::route;
    use spin_sdk::http::Method;

    #[test]
    fn registration_hides_password() {
        let store = MemoryStore::new();
        let body = serde_json::json!({ "username": "alice", "password": "secret" });
        let resp = route(&store, &request(Method::Post, "/users/", None, Some(body)));

        assert_eq!(*resp.status(), 201);
        let json = body_json(&resp);
        assert_eq!(json["username"], "alice");
        assert!(json.get("password").is_none());
    }

    #[test]
    fn duplicate_username_conflicts() {
        let store = MemoryStore::new();
        signup(&store, "alice");

        let body = serde_json::json!({ "username": "alice", "password": "other" });
        let resp = route(&store, &request(Method::Post, "/users/", None, Some(body)));
        assert_eq!(*resp.status(), 409);
    }

    #[test]
    fn registration_validates_fields() {
        let store = MemoryStore::new();
        let body = serde_json::json!({ "username": "al", "password": "" });
        let resp = route(&store, &request(Method::Post, "/users/", None, Some(body)));

        assert_eq!(*resp.status(), 400);
        let json = body_json(&resp);
        assert!(json["fields"]["username"].is_array());
        assert!(json["fields"]["password"].is_array());
    }

    #[test]
    fn me_requires_token() {
        let store = MemoryStore::new();
        let (user_id, token) = signup(&store, "alice");

        let resp = route(&store, &request(Method::Get, "/users/me/", None, None));
        assert_eq!(*resp.status(), 401);

        let resp = route(&store, &request(Method::Get, "/users/me/", Some(&token), None));
        assert_eq!(*resp.status(), 200);
        assert_eq!(body_json(&resp)["id"], user_id.as_str());
    }

    #[test]
    fn deleting_account_cascades() {
        let store = MemoryStore::new();
        let (alice_id, alice) = signup(&store, "alice");
        let (_, bob) = signup(&store, "bob");

        let profile = serde_json::json!({ "first_name": "Alice", "last_name": "A", "gender": "Female" });
        let resp = route(&store, &request(Method::Post, "/profiles/", Some(&alice), Some(profile)));
        let alice_profile = body_json(&resp)["id"].as_str().unwrap().to_string();
        let post = serde_json::json!({ "title": "hello", "content": "first" });
        route(&store, &request(Method::Post, "/posts/", Some(&alice), Some(post)));

        let profile = serde_json::json!({
            "first_name": "Bob", "last_name": "B", "gender": "Male", "following": [alice_id]
        });
        let resp = route(&store, &request(Method::Post, "/profiles/", Some(&bob), Some(profile)));
        let bob_profile = body_json(&resp)["id"].as_str().unwrap().to_string();

        let resp = route(&store, &request(Method::Delete, "/users/me/", Some(&alice), None));
        assert_eq!(*resp.status(), 204);

        let resp = route(&store, &request(Method::Get, &format!("/profiles/{}/", alice_profile), None, None));
        assert_eq!(*resp.status(), 404);

        let resp = route(&store, &request(Method::Get, "/posts/", None, None));
        assert_eq!(body_json(&resp)["count"], 0);

        let resp = route(&store, &request(Method::Get, &format!("/profiles/{}/", bob_profile), None, None));
        assert_eq!(body_json(&resp)["following"], serde_json::json!([]));

        // the old token no longer authenticates
        let resp = route(&store, &request(Method::Get, "/users/me/", Some(&alice), None));
        assert_eq!(*resp.status(), 401);
    }

    #[test]
    fn usernames_with_markup_characters_can_log_in() {
        let store = MemoryStore::new();

        for name in ["a&b", "<bob>"] {
            let (user_id, token) = signup(&store, name);
            let resp = route(&store, &request(Method::Get, "/users/me/", Some(&token), None));
            assert_eq!(body_json(&resp)["username"], name);
            assert_eq!(find_user_by_username(&store, name).unwrap().unwrap().id, user_id);
        }
    }

    #[test]
    fn concurrent_registrations_keep_usernames_unique() {
        let store = MemoryStore::new();
        let body = serde_json::json!({ "username": "alice", "password": "secret" });

        let statuses: Vec<u16> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let (store, body) = (&store, &body);
                    scope.spawn(move || {
                        let req = request(Method::Post, "/users/", None, Some(body.clone()));
                        *route(store, &req).status()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(statuses.iter().filter(|s| **s == 201).count(), 1);
        assert_eq!(statuses.iter().filter(|s| **s == 409).count(), 3);
        let users: Vec<String> = store.get_json(USERS_LIST_KEY).unwrap().unwrap();
        assert_eq!(users.len(), 1);
    }

    #[test]
    fn deleted_username_can_register_again() {
        let store = MemoryStore::new();
        let (_, token) = signup(&store, "alice");

        let resp = route(&store, &request(Method::Delete, "/users/me/", Some(&token), None));
        assert_eq!(*resp.status(), 204);
        assert!(find_user_by_username(&store, "alice").unwrap().is_none());
        signup(&store, "alice");
    }
}
