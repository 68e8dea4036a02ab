use http::StatusCode;
use serde::Deserialize;
use spin_sdk::http::Request;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{token_expiration_hours, token_key, user_key, TOKENS_LIST_KEY};
use crate::core::errors::{ApiError, ApiResult};
use crate::core::helpers::{json_response, now, parse_body, verify_password};
use crate::core::store::{JsonStore, KeyValue};
use crate::models::{TokenData, User};
use crate::profiles::profile_id_for_user;
use crate::users::find_user_by_username;

#[derive(Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// The authenticated side of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub user_id: String,
    /// The requester's own profile, once created.
    pub profile_id: Option<String>,
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.header("Authorization")?
        .as_str()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub fn issue_token(store: &dyn KeyValue, user_id: &str) -> anyhow::Result<String> {
    let token = Uuid::new_v4().to_string();
    let data = TokenData {
        user_id: user_id.to_string(),
        created_at: now(),
    };
    store.set_json(&token_key(&token), &data)?;
    store.update_json(TOKENS_LIST_KEY, |tokens: &mut Vec<String>| tokens.push(token.clone()))?;

    Ok(token)
}

pub fn revoke_token(store: &dyn KeyValue, token: &str) -> anyhow::Result<()> {
    store.delete(&token_key(token))?;
    store.update_json(TOKENS_LIST_KEY, |tokens: &mut Vec<String>| tokens.retain(|t| t != token))
}

/// Drops every token issued to `user_id`.
pub fn revoke_user_tokens(store: &dyn KeyValue, user_id: &str) -> anyhow::Result<()> {
    let tokens: Vec<String> = store.get_json(TOKENS_LIST_KEY)?.unwrap_or_default();
    let mut revoked = Vec::new();

    for token in tokens {
        let key = token_key(&token);
        match store.get_json::<TokenData>(&key)? {
            Some(data) if data.user_id == user_id => {
                store.delete(&key)?;
                revoked.push(token);
            }
            Some(_) => {}
            None => revoked.push(token),
        }
    }

    store.update_json(TOKENS_LIST_KEY, |tokens: &mut Vec<String>| {
        tokens.retain(|t| !revoked.contains(t))
    })
}

/// Resolves the bearer token to a user id.
///
/// Expired tokens and tokens whose user no longer exists resolve to `None`.
pub fn validate_token(store: &dyn KeyValue, req: &Request) -> anyhow::Result<Option<String>> {
    let token = match bearer_token(req) {
        Some(token) => token,
        None => return Ok(None),
    };

    let data = match store.get_json::<TokenData>(&token_key(token))? {
        Some(data) => data,
        None => return Ok(None),
    };

    let age_hours = (now() - data.created_at).num_hours();
    if age_hours > token_expiration_hours() {
        return Ok(None);
    }

    if store.get_json::<User>(&user_key(&data.user_id))?.is_none() {
        return Ok(None);
    }

    Ok(Some(data.user_id))
}

pub fn require_user(store: &dyn KeyValue, req: &Request) -> Result<String, ApiError> {
    validate_token(store, req)?.ok_or(ApiError::Unauthorized)
}

pub fn resolve_requester(store: &dyn KeyValue, req: &Request) -> anyhow::Result<Option<Requester>> {
    let user_id = match validate_token(store, req)? {
        Some(uid) => uid,
        None => return Ok(None),
    };
    let profile_id = profile_id_for_user(store, &user_id)?;

    Ok(Some(Requester { user_id, profile_id }))
}

pub fn require_requester(store: &dyn KeyValue, req: &Request) -> Result<Requester, ApiError> {
    resolve_requester(store, req)?.ok_or(ApiError::Unauthorized)
}

// === HTTP Handlers ===

pub fn login_user(store: &dyn KeyValue, req: &Request) -> ApiResult {
    let creds: Credentials = parse_body(req)?;

    let user = match find_user_by_username(store, creds.username.trim())? {
        Some(u) if verify_password(&creds.password, &u.password) => u,
        _ => {
            warn!(username = %creds.username, "rejected login");
            return Err(ApiError::Unauthorized);
        }
    };

    let token = issue_token(store, &user.id)?;
    info!(user_id = %user.id, "user logged in");

    json_response(
        StatusCode::OK,
        &serde_json::json!({
            "token": token,
            "user_id": user.id,
        }),
    )
}

pub fn logout_user(store: &dyn KeyValue, req: &Request) -> ApiResult {
    let token = bearer_token(req).ok_or(ApiError::Unauthorized)?;
    revoke_token(store, token)?;

    json_response(
        StatusCode::OK,
        &serde_json::json!({ "message": "Logged out successfully" }),
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::store::MemoryStore;
    use crate::router::route;
    use spin_sdk::http::{Method, Response};

    /// Build a JSON request, optionally authenticated.
    pub(crate) fn request(
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> Request {
        let mut builder = Request::builder();
        let with_uri = builder.method(method).uri(uri);
        let with_auth = match token {
            Some(t) => with_uri.header("Authorization", format!("Bearer {}", t)),
            None => with_uri,
        };
        let bytes = body
            .map(|b| serde_json::to_vec(&b).unwrap())
            .unwrap_or_default();
        with_auth.header("Content-Type", "application/json").body(bytes).build()
    }

    pub(crate) fn body_json(resp: &Response) -> serde_json::Value {
        serde_json::from_slice(resp.body()).unwrap()
    }

    /// Register `username` and return `(user_id, token)`.
    pub(crate) fn signup(store: &MemoryStore, username: &str) -> (String, String) {
        let creds = serde_json::json!({ "username": username, "password": "secret" });
        let resp = route(store, &request(Method::Post, "/users/", None, Some(creds.clone())));
        assert_eq!(*resp.status(), 201, "signup failed: {:?}", body_json(&resp));
        let user_id = body_json(&resp)["id"].as_str().unwrap().to_string();

        let resp = route(store, &request(Method::Post, "/login/", None, Some(creds)));
        assert_eq!(*resp.status(), 200);
        let token = body_json(&resp)["token"].as_str().unwrap().to_string();

        (user_id, token)
    }

    #[test]
    fn login_returns_token_for_valid_credentials() {
        let store = MemoryStore::new();
        let (user_id, token) = signup(&store, "alice");

        let req = request(Method::Get, "/users/me/", Some(&token), None);
        assert_eq!(validate_token(&store, &req).unwrap(), Some(user_id));
    }

    #[test]
    fn login_rejects_wrong_password() {
        let store = MemoryStore::new();
        signup(&store, "alice");

        let creds = serde_json::json!({ "username": "alice", "password": "nope" });
        let resp = route(&store, &request(Method::Post, "/login/", None, Some(creds)));
        assert_eq!(*resp.status(), 401);
    }

    #[test]
    fn unknown_or_missing_token_is_anonymous() {
        let store = MemoryStore::new();
        let req = request(Method::Get, "/", Some("bogus"), None);
        assert_eq!(validate_token(&store, &req).unwrap(), None);

        let req = request(Method::Get, "/", None, None);
        assert_eq!(validate_token(&store, &req).unwrap(), None);
    }

    #[test]
    fn expired_token_is_rejected() {
        let store = MemoryStore::new();
        let (user_id, _) = signup(&store, "alice");

        let stale = TokenData {
            user_id,
            created_at: now() - chrono::Duration::hours(token_expiration_hours() + 2),
        };
        store.set_json(&token_key("stale"), &stale).unwrap();

        let req = request(Method::Get, "/", Some("stale"), None);
        assert_eq!(validate_token(&store, &req).unwrap(), None);
    }

    #[test]
    fn logout_revokes_token() {
        let store = MemoryStore::new();
        let (_, token) = signup(&store, "alice");

        let resp = route(&store, &request(Method::Post, "/logout/", Some(&token), None));
        assert_eq!(*resp.status(), 200);

        let req = request(Method::Get, "/", Some(&token), None);
        assert_eq!(validate_token(&store, &req).unwrap(), None);
    }

    #[test]
    fn requester_carries_profile_once_created() {
        let store = MemoryStore::new();
        let (user_id, token) = signup(&store, "alice");

        let req = request(Method::Get, "/", Some(&token), None);
        let requester = resolve_requester(&store, &req).unwrap().unwrap();
        assert_eq!(requester.user_id, user_id);
        assert!(requester.profile_id.is_none());

        let body = serde_json::json!({ "first_name": "Alice", "last_name": "Liddell", "gender": "Female" });
        let resp = route(&store, &request(Method::Post, "/profiles/", Some(&token), Some(body)));
        let profile_id = body_json(&resp)["id"].as_str().unwrap().to_string();

        let requester = resolve_requester(&store, &req).unwrap().unwrap();
        assert_eq!(requester.profile_id, Some(profile_id));
    }
}
