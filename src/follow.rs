use http::StatusCode;
use spin_sdk::http::Request;
use tracing::info;

use crate::auth::require_requester;
use crate::core::errors::{ApiError, ApiResult};
use crate::core::helpers::json_response;
use crate::core::store::KeyValue;
use crate::models::Profile;
use crate::profiles::{all_profiles, load_profile, load_profile_for_user, lookup_profile, save_profile};
use crate::users::load_user;

/// Profiles whose user follows `user_id`.
pub fn followers_of(store: &dyn KeyValue, user_id: &str) -> anyhow::Result<Vec<Profile>> {
    Ok(all_profiles(store)?
        .into_iter()
        .filter(|p| p.following.iter().any(|id| id == user_id))
        .collect())
}

pub fn follower_names(store: &dyn KeyValue, user_id: &str) -> anyhow::Result<Vec<String>> {
    Ok(followers_of(store, user_id)?
        .iter()
        .map(Profile::full_name)
        .collect())
}

/// Display names of the users `profile` follows.
///
/// Users without a profile are shown by username.
pub fn following_names(store: &dyn KeyValue, profile: &Profile) -> anyhow::Result<Vec<String>> {
    let mut names = Vec::with_capacity(profile.following.len());

    for user_id in &profile.following {
        if let Some(followed) = load_profile_for_user(store, user_id)? {
            names.push(followed.full_name());
        } else if let Some(user) = load_user(store, user_id)? {
            names.push(user.username);
        }
    }

    Ok(names)
}

/// Checks a requested `following` list: every id must be an existing user
/// other than `own_user_id`. Duplicates are dropped, order is kept.
pub fn validate_following(
    store: &dyn KeyValue,
    own_user_id: &str,
    ids: Vec<String>,
) -> Result<Vec<String>, ApiError> {
    let mut following: Vec<String> = Vec::with_capacity(ids.len());

    for id in ids {
        if id == own_user_id {
            return Err(ApiError::field("following", "A user cannot follow themselves."));
        }
        if load_user(store, &id)?.is_none() {
            return Err(ApiError::field(
                "following",
                format!("Invalid pk \"{}\" - object does not exist.", id),
            ));
        }
        if !following.contains(&id) {
            following.push(id);
        }
    }

    Ok(following)
}

pub fn follow_user(store: &dyn KeyValue, profile: &mut Profile, target_user_id: &str) -> anyhow::Result<()> {
    if !profile.following.iter().any(|id| id == target_user_id) {
        profile.following.push(target_user_id.to_string());
        save_profile(store, profile)?;
    }

    Ok(())
}

pub fn unfollow_user(store: &dyn KeyValue, profile: &mut Profile, target_user_id: &str) -> anyhow::Result<()> {
    let before = profile.following.len();
    profile.following.retain(|id| id != target_user_id);
    if profile.following.len() != before {
        save_profile(store, profile)?;
    }

    Ok(())
}

/// Drops `user_id` from every profile's `following`.
pub fn remove_from_followings(store: &dyn KeyValue, user_id: &str) -> anyhow::Result<()> {
    for mut profile in followers_of(store, user_id)? {
        unfollow_user(store, &mut profile, user_id)?;
    }

    Ok(())
}

/// Loads the requester's profile and the target profile for a follow action.
fn follow_pair(store: &dyn KeyValue, req: &Request, target_profile_id: &str) -> Result<(Profile, Profile), ApiError> {
    let requester = require_requester(store, req)?;
    let target = lookup_profile(store, target_profile_id)?;

    let own_id = requester
        .profile_id
        .ok_or_else(|| ApiError::BadRequest("Create a profile before following others".to_string()))?;
    let own = load_profile(store, &own_id)?
        .ok_or_else(|| ApiError::BadRequest("Create a profile before following others".to_string()))?;

    Ok((own, target))
}

// === HTTP Handlers ===

pub fn handle_follow(store: &dyn KeyValue, req: &Request, target_profile_id: &str) -> ApiResult {
    let (mut own, target) = follow_pair(store, req, target_profile_id)?;

    if own.user_id == target.user_id {
        return Err(ApiError::BadRequest("A user cannot follow themselves".to_string()));
    }

    follow_user(store, &mut own, &target.user_id)?;
    info!(profile_id = %own.id, target = %target.id, "followed");

    json_response(StatusCode::OK, &serde_json::json!({ "status": "followed" }))
}

pub fn handle_unfollow(store: &dyn KeyValue, req: &Request, target_profile_id: &str) -> ApiResult {
    let (mut own, target) = follow_pair(store, req, target_profile_id)?;

    unfollow_user(store, &mut own, &target.user_id)?;
    info!(profile_id = %own.id, target = %target.id, "unfollowed");

    json_response(StatusCode::OK, &serde_json::json!({ "status": "unfollowed" }))
}
