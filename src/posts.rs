use std::collections::HashMap;

use http::StatusCode;
use spin_sdk::http::Request;
use tracing::info;

use crate::auth::require_requester;
use crate::config::*;
use crate::core::errors::{ApiError, ApiResult};
use crate::core::helpers::{icontains, json_response, new_id, no_content, now, parse_body, validate_uuid};
use crate::core::pagination::Pagination;
use crate::core::query_params::{get_filter, parse_query_params};
use crate::core::store::{JsonStore, KeyValue};
use crate::models::Post;
use crate::permissions::check_object_permission;
use crate::serializers::{PostInput, PostView, PostWrite};

pub fn load_post(store: &dyn KeyValue, id: &str) -> anyhow::Result<Option<Post>> {
    store.get_json::<Post>(&post_key(id))
}

pub fn save_post(store: &dyn KeyValue, post: &Post) -> anyhow::Result<()> {
    store.set_json(&post_key(&post.id), post)
}

pub fn insert_post(store: &dyn KeyValue, post: &Post) -> anyhow::Result<()> {
    save_post(store, post)?;
    // newest first
    store.update_json(FEED_KEY, |feed: &mut Vec<String>| feed.insert(0, post.id.clone()))
}

/// Every post, newest first.
pub fn all_posts(store: &dyn KeyValue) -> anyhow::Result<Vec<Post>> {
    let feed: Vec<String> = store.get_json(FEED_KEY)?.unwrap_or_default();
    let mut posts = Vec::with_capacity(feed.len());

    for id in feed.iter() {
        if let Some(p) = load_post(store, id)? {
            posts.push(p);
        }
    }

    // stable: equal timestamps keep feed order
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(posts)
}

pub fn posts_for_profile(store: &dyn KeyValue, profile_id: &str) -> anyhow::Result<Vec<Post>> {
    Ok(all_posts(store)?
        .into_iter()
        .filter(|p| p.profile_id == profile_id)
        .collect())
}

pub fn delete_post_record(store: &dyn KeyValue, post_id: &str) -> anyhow::Result<()> {
    store.delete(&post_key(post_id))?;
    store.update_json(FEED_KEY, |feed: &mut Vec<String>| feed.retain(|id| id != post_id))
}

pub fn delete_posts_for_profile(store: &dyn KeyValue, profile_id: &str) -> anyhow::Result<()> {
    for post in posts_for_profile(store, profile_id)? {
        delete_post_record(store, &post.id)?;
    }

    Ok(())
}

pub fn lookup_post(store: &dyn KeyValue, id: &str) -> Result<Post, ApiError> {
    if !validate_uuid(id) {
        return Err(ApiError::NotFound("Post not found".to_string()));
    }

    load_post(store, id)?.ok_or_else(|| ApiError::NotFound("Post not found".to_string()))
}

/// `?hashtag=` and `?title=` match substrings ignoring case.
#[derive(Debug, Default)]
pub struct PostFilter {
    pub hashtag: Option<String>,
    pub title: Option<String>,
}

impl PostFilter {
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        Self {
            hashtag: get_filter(params, "hashtag").map(String::from),
            title: get_filter(params, "title").map(String::from),
        }
    }

    pub fn matches(&self, post: &Post) -> bool {
        let hashtag_ok = self.hashtag.as_deref().map_or(true, |h| icontains(&post.hashtag, h));
        let title_ok = self.title.as_deref().map_or(true, |t| icontains(&post.title, t));
        hashtag_ok && title_ok
    }
}

// === HTTP Handlers ===

pub fn list_posts(store: &dyn KeyValue, req: &Request) -> ApiResult {
    let params = parse_query_params(&req.uri());
    let filter = PostFilter::from_params(&params);

    let posts: Vec<Post> = all_posts(store)?
        .into_iter()
        .filter(|p| filter.matches(p))
        .collect();

    let page = Pagination::default()
        .paginate(posts, &params, req.path())?
        .try_map(|p| PostView::build(store, &p))?;

    json_response(StatusCode::OK, &page)
}

pub fn create_post(store: &dyn KeyValue, req: &Request) -> ApiResult {
    let requester = require_requester(store, req)?;
    let profile_id = requester
        .profile_id
        .ok_or_else(|| ApiError::BadRequest("Create a profile before publishing posts".to_string()))?;

    let input: PostInput = parse_body(req)?;
    let changes = input.validate(false)?;

    let mut post = Post {
        id: new_id(),
        profile_id,
        title: String::new(),
        content: String::new(),
        hashtag: String::new(),
        created_at: now(),
    };
    changes.apply(&mut post);

    insert_post(store, &post)?;
    info!(post_id = %post.id, profile_id = %post.profile_id, "post created");

    json_response(StatusCode::CREATED, &PostWrite::from(&post))
}

pub fn retrieve_post(store: &dyn KeyValue, id: &str) -> ApiResult {
    let post = lookup_post(store, id)?;
    json_response(StatusCode::OK, &PostView::build(store, &post)?)
}

/// PUT when `partial` is false, PATCH otherwise.
pub fn update_post(store: &dyn KeyValue, req: &Request, id: &str, partial: bool) -> ApiResult {
    let requester = require_requester(store, req)?;
    let mut post = lookup_post(store, id)?;
    check_object_permission(&post, req.method(), Some(&requester))?;

    let input: PostInput = parse_body(req)?;
    input.validate(partial)?.apply(&mut post);

    save_post(store, &post)?;
    info!(post_id = %post.id, partial, "post updated");

    json_response(StatusCode::OK, &PostWrite::from(&post))
}

pub fn destroy_post(store: &dyn KeyValue, req: &Request, id: &str) -> ApiResult {
    let requester = require_requester(store, req)?;
    let post = lookup_post(store, id)?;
    check_object_permission(&post, req.method(), Some(&requester))?;

    delete_post_record(store, &post.id)?;
    info!(post_id = %post.id, "post deleted");

    no_content()
}
