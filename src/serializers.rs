//! Response shapes per action and validation of write payloads.
//!
//! Profiles and posts each have a list shape, a detail shape and a write
//! shape; handlers pick one depending on the action.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::*;
use crate::core::errors::{ApiError, FieldErrors};
use crate::core::helpers::filter_post_content;
use crate::core::store::KeyValue;
use crate::follow::{follower_names, followers_of, following_names};
use crate::models::{Gender, Post, Profile, User};
use crate::posts::posts_for_profile;
use crate::profiles::load_profile;
use crate::users::load_user;

const REQUIRED: &str = "This field is required.";
const BLANK: &str = "This field may not be blank.";

#[derive(Serialize, Debug)]
pub struct UserSummary {
    pub id: String,
    pub username: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
        }
    }
}

// === Profiles ===

#[derive(Serialize, Debug)]
pub struct ProfileSummary {
    pub id: String,
    pub full_name: String,
    pub gender: Gender,
    pub followers_count: usize,
    pub posts_count: usize,
}

impl ProfileSummary {
    pub fn build(store: &dyn KeyValue, profile: &Profile) -> anyhow::Result<Self> {
        Ok(Self {
            id: profile.id.clone(),
            full_name: profile.full_name(),
            gender: profile.gender,
            followers_count: followers_of(store, &profile.user_id)?.len(),
            posts_count: posts_for_profile(store, &profile.id)?.len(),
        })
    }
}

#[derive(Serialize, Debug)]
pub struct ProfilePost {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Debug)]
pub struct ProfileDetail {
    pub id: String,
    pub user: Option<UserSummary>,
    pub posts: Vec<ProfilePost>,
    pub first_name: String,
    pub last_name: String,
    pub biography: String,
    pub gender: Gender,
    pub following: Vec<String>,
    pub followers: Vec<String>,
}

impl ProfileDetail {
    pub fn build(store: &dyn KeyValue, profile: &Profile) -> anyhow::Result<Self> {
        let user = load_user(store, &profile.user_id)?;
        let posts = posts_for_profile(store, &profile.id)?
            .into_iter()
            .map(|p| ProfilePost {
                id: p.id,
                title: p.title,
                created_at: p.created_at,
            })
            .collect();

        Ok(Self {
            id: profile.id.clone(),
            user: user.as_ref().map(UserSummary::from),
            posts,
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            biography: profile.biography.clone(),
            gender: profile.gender,
            following: following_names(store, profile)?,
            followers: follower_names(store, &profile.user_id)?,
        })
    }
}

#[derive(Serialize, Debug)]
pub struct ProfileWrite {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub biography: String,
    pub gender: Gender,
    pub following: Vec<String>,
}

impl From<&Profile> for ProfileWrite {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id.clone(),
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            biography: profile.biography.clone(),
            gender: profile.gender,
            following: profile.following.clone(),
        }
    }
}

#[derive(Deserialize, Default, Debug)]
pub struct ProfileInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub biography: Option<String>,
    pub gender: Option<String>,
    pub following: Option<Vec<String>>,
}

/// Validated profile fields; `None` leaves the stored value untouched.
#[derive(Debug, Default)]
pub struct ProfileChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub biography: Option<String>,
    pub gender: Option<Gender>,
    pub following: Option<Vec<String>>,
}

impl ProfileInput {
    /// `partial` relaxes required fields, as for PATCH.
    pub fn validate(self, partial: bool) -> Result<ProfileChanges, ApiError> {
        let mut errors = FieldErrors::new();
        let required = !partial;

        let first_name = check_text(&mut errors, "first_name", self.first_name, required, false, MAX_NAME_LENGTH);
        let last_name = check_text(&mut errors, "last_name", self.last_name, required, false, MAX_NAME_LENGTH);
        let biography = check_text(&mut errors, "biography", self.biography, false, true, MAX_BIOGRAPHY_LENGTH);

        let gender = match self.gender {
            Some(raw) => match raw.parse::<Gender>() {
                Ok(g) => Some(g),
                Err(msg) => {
                    push(&mut errors, "gender", msg);
                    None
                }
            },
            None => {
                if required {
                    push(&mut errors, "gender", REQUIRED);
                }
                None
            }
        };

        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }

        Ok(ProfileChanges {
            first_name,
            last_name,
            biography,
            gender,
            following: self.following,
        })
    }
}

impl ProfileChanges {
    pub fn apply(self, profile: &mut Profile) {
        if let Some(v) = self.first_name {
            profile.first_name = v;
        }
        if let Some(v) = self.last_name {
            profile.last_name = v;
        }
        if let Some(v) = self.biography {
            profile.biography = v;
        }
        if let Some(v) = self.gender {
            profile.gender = v;
        }
        if let Some(v) = self.following {
            profile.following = v;
        }
    }
}

// === Posts ===

#[derive(Serialize, Debug)]
pub struct PostView {
    pub id: String,
    pub author: String,
    pub title: String,
    pub content: String,
    pub hashtag: String,
    pub created_at: DateTime<Utc>,
}

impl PostView {
    pub fn build(store: &dyn KeyValue, post: &Post) -> anyhow::Result<Self> {
        let author = load_profile(store, &post.profile_id)?
            .map(|p| p.full_name())
            .unwrap_or_default();

        Ok(Self {
            id: post.id.clone(),
            author,
            title: post.title.clone(),
            content: post.content.clone(),
            hashtag: post.hashtag.clone(),
            created_at: post.created_at,
        })
    }
}

#[derive(Serialize, Debug)]
pub struct PostWrite {
    pub id: String,
    pub profile: String,
    pub title: String,
    pub content: String,
    pub hashtag: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Post> for PostWrite {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id.clone(),
            profile: post.profile_id.clone(),
            title: post.title.clone(),
            content: post.content.clone(),
            hashtag: post.hashtag.clone(),
            created_at: post.created_at,
        }
    }
}

#[derive(Deserialize, Default, Debug)]
pub struct PostInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub hashtag: Option<String>,
}

#[derive(Debug, Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub hashtag: Option<String>,
}

impl PostInput {
    pub fn validate(self, partial: bool) -> Result<PostChanges, ApiError> {
        let mut errors = FieldErrors::new();
        let required = !partial;

        let title = check_text(&mut errors, "title", self.title, required, false, MAX_TITLE_LENGTH);
        let hashtag = check_text(&mut errors, "hashtag", self.hashtag, false, true, MAX_HASHTAG_LENGTH);

        // limits apply to the filtered markup, which is what gets stored
        let content = match self.content.map(|c| filter_post_content(c.trim())) {
            Some(c) if c.trim().is_empty() => {
                push(&mut errors, "content", BLANK);
                None
            }
            Some(c) if c.chars().count() > MAX_POST_LENGTH => {
                push(&mut errors, "content", max_length_message(MAX_POST_LENGTH));
                None
            }
            Some(c) => Some(c),
            None => {
                if required {
                    push(&mut errors, "content", REQUIRED);
                }
                None
            }
        };

        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }

        Ok(PostChanges { title, content, hashtag })
    }
}

impl PostChanges {
    pub fn apply(self, post: &mut Post) {
        if let Some(v) = self.title {
            post.title = v;
        }
        if let Some(v) = self.content {
            post.content = v;
        }
        if let Some(v) = self.hashtag {
            post.hashtag = v;
        }
    }
}

// === Field checks ===

fn push(errors: &mut FieldErrors, field: &str, message: impl Into<String>) {
    errors.entry(field.to_string()).or_default().push(message.into());
}

fn max_length_message(max: usize) -> String {
    format!("Ensure this field has no more than {} characters.", max)
}

/// Validates a plain-text field and returns it trimmed, otherwise unchanged.
fn check_text(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<String>,
    required: bool,
    allow_blank: bool,
    max: usize,
) -> Option<String> {
    let value = match value {
        Some(v) => v,
        None => {
            if required {
                push(errors, field, REQUIRED);
            }
            return None;
        }
    };

    let trimmed = value.trim();
    if trimmed.is_empty() && !allow_blank {
        push(errors, field, BLANK);
        return None;
    }
    if trimmed.chars().count() > max {
        push(errors, field, max_length_message(max));
        return None;
    }

    Some(trimmed.to_string())
}
