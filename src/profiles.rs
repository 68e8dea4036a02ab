use std::collections::HashMap;

use http::StatusCode;
use spin_sdk::http::Request;
use tracing::info;

use crate::auth::require_requester;
use crate::config::*;
use crate::core::errors::{ApiError, ApiResult};
use crate::core::helpers::{icontains, json_response, new_id, no_content, parse_body, validate_uuid};
use crate::core::pagination::Pagination;
use crate::core::query_params::{get_filter, parse_query_params};
use crate::core::store::{JsonStore, KeyValue};
use crate::follow::validate_following;
use crate::models::{Gender, Profile};
use crate::permissions::check_object_permission;
use crate::posts::delete_posts_for_profile;
use crate::serializers::{ProfileDetail, ProfileInput, ProfileSummary, ProfileWrite};

pub fn load_profile(store: &dyn KeyValue, id: &str) -> anyhow::Result<Option<Profile>> {
    store.get_json::<Profile>(&profile_key(id))
}

pub fn profile_id_for_user(store: &dyn KeyValue, user_id: &str) -> anyhow::Result<Option<String>> {
    store.get_json::<String>(&profile_by_user_key(user_id))
}

pub fn load_profile_for_user(store: &dyn KeyValue, user_id: &str) -> anyhow::Result<Option<Profile>> {
    match profile_id_for_user(store, user_id)? {
        Some(id) => load_profile(store, &id),
        None => Ok(None),
    }
}

/// Every profile in creation order.
pub fn all_profiles(store: &dyn KeyValue) -> anyhow::Result<Vec<Profile>> {
    let ids: Vec<String> = store.get_json(PROFILES_LIST_KEY)?.unwrap_or_default();
    let mut profiles = Vec::with_capacity(ids.len());

    for id in ids {
        if let Some(p) = load_profile(store, &id)? {
            profiles.push(p);
        }
    }

    Ok(profiles)
}

pub fn save_profile(store: &dyn KeyValue, profile: &Profile) -> anyhow::Result<()> {
    store.set_json(&profile_key(&profile.id), profile)
}

/// Stores a new profile, or returns `false` when its user already has one.
pub fn insert_profile(store: &dyn KeyValue, profile: &Profile) -> anyhow::Result<bool> {
    if !store.set_json_if_absent(&profile_by_user_key(&profile.user_id), &profile.id)? {
        return Ok(false);
    }
    save_profile(store, profile)?;
    store.update_json(PROFILES_LIST_KEY, |ids: &mut Vec<String>| ids.push(profile.id.clone()))?;

    Ok(true)
}

/// Removes the profile and every post it authored.
pub fn delete_profile_cascade(store: &dyn KeyValue, profile: &Profile) -> anyhow::Result<()> {
    delete_posts_for_profile(store, &profile.id)?;

    store.delete(&profile_key(&profile.id))?;
    store.delete(&profile_by_user_key(&profile.user_id))?;
    store.update_json(PROFILES_LIST_KEY, |ids: &mut Vec<String>| ids.retain(|id| id != &profile.id))
}

/// Loads a profile addressed by URL, 404 when malformed or missing.
pub fn lookup_profile(store: &dyn KeyValue, id: &str) -> Result<Profile, ApiError> {
    if !validate_uuid(id) {
        return Err(ApiError::NotFound("Profile not found".to_string()));
    }

    load_profile(store, id)?.ok_or_else(|| ApiError::NotFound("Profile not found".to_string()))
}

/// `?first_name=` and `?last_name=` match substrings ignoring case,
/// `?gender=` matches exactly.
#[derive(Debug, Default)]
pub struct ProfileFilter {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
}

impl ProfileFilter {
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        Self {
            first_name: get_filter(params, "first_name").map(String::from),
            last_name: get_filter(params, "last_name").map(String::from),
            gender: get_filter(params, "gender").map(String::from),
        }
    }

    pub fn matches(&self, profile: &Profile) -> bool {
        if let Some(first_name) = &self.first_name {
            if !icontains(&profile.first_name, first_name) {
                return false;
            }
        }
        if let Some(last_name) = &self.last_name {
            if !icontains(&profile.last_name, last_name) {
                return false;
            }
        }
        if let Some(gender) = &self.gender {
            if profile.gender.as_str() != gender {
                return false;
            }
        }
        true
    }
}

// === HTTP Handlers ===

pub fn list_profiles(store: &dyn KeyValue, req: &Request) -> ApiResult {
    let params = parse_query_params(&req.uri());
    let filter = ProfileFilter::from_params(&params);

    let profiles: Vec<Profile> = all_profiles(store)?
        .into_iter()
        .filter(|p| filter.matches(p))
        .collect();

    let page = Pagination::default()
        .paginate(profiles, &params, req.path())?
        .try_map(|p| ProfileSummary::build(store, &p))?;

    json_response(StatusCode::OK, &page)
}

fn profile_exists() -> ApiError {
    ApiError::BadRequest("Profile already exists for this user".to_string())
}

pub fn create_profile(store: &dyn KeyValue, req: &Request) -> ApiResult {
    let requester = require_requester(store, req)?;
    if requester.profile_id.is_some() {
        return Err(profile_exists());
    }

    let input: ProfileInput = parse_body(req)?;
    let mut changes = input.validate(false)?;
    if let Some(ids) = changes.following.take() {
        changes.following = Some(validate_following(store, &requester.user_id, ids)?);
    }

    let mut profile = Profile {
        id: new_id(),
        user_id: requester.user_id.clone(),
        first_name: String::new(),
        last_name: String::new(),
        biography: String::new(),
        gender: Gender::Unknown,
        following: Vec::new(),
    };
    changes.apply(&mut profile);

    if !insert_profile(store, &profile)? {
        return Err(profile_exists());
    }
    info!(profile_id = %profile.id, user_id = %profile.user_id, "profile created");

    json_response(StatusCode::CREATED, &ProfileWrite::from(&profile))
}

pub fn retrieve_profile(store: &dyn KeyValue, id: &str) -> ApiResult {
    let profile = lookup_profile(store, id)?;
    json_response(StatusCode::OK, &ProfileDetail::build(store, &profile)?)
}

/// PUT when `partial` is false, PATCH otherwise.
pub fn update_profile(store: &dyn KeyValue, req: &Request, id: &str, partial: bool) -> ApiResult {
    let requester = require_requester(store, req)?;
    let mut profile = lookup_profile(store, id)?;
    check_object_permission(&profile, req.method(), Some(&requester))?;

    let input: ProfileInput = parse_body(req)?;
    let mut changes = input.validate(partial)?;
    if let Some(ids) = changes.following.take() {
        changes.following = Some(validate_following(store, &profile.user_id, ids)?);
    }
    changes.apply(&mut profile);

    save_profile(store, &profile)?;
    info!(profile_id = %profile.id, partial, "profile updated");

    json_response(StatusCode::OK, &ProfileWrite::from(&profile))
}

pub fn destroy_profile(store: &dyn KeyValue, req: &Request, id: &str) -> ApiResult {
    let requester = require_requester(store, req)?;
    let profile = lookup_profile(store, id)?;
    check_object_permission(&profile, req.method(), Some(&requester))?;

    delete_profile_cascade(store, &profile)?;
    info!(profile_id = %profile.id, "profile deleted");

    no_content()
}
