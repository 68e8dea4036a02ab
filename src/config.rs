use std::{env, fmt::Display, net::SocketAddr, str::FromStr};

use tracing::{debug, warn};

// === Validation limits ===
pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 50;
pub const MIN_PASSWORD_LENGTH: usize = 3;
pub const MAX_NAME_LENGTH: usize = 255;
pub const MAX_BIOGRAPHY_LENGTH: usize = 500;
pub const MAX_TITLE_LENGTH: usize = 70;
pub const MAX_HASHTAG_LENGTH: usize = 50;
pub const MAX_POST_LENGTH: usize = 5000;

// === Pagination ===
pub const PAGE_SIZE: usize = 5;
pub const MAX_PAGE_SIZE: usize = 30;

// === Store layout ===
pub const USERS_LIST_KEY: &str = "users_list";
pub const TOKENS_LIST_KEY: &str = "tokens_list";
pub const PROFILES_LIST_KEY: &str = "profiles_list";
pub const FEED_KEY: &str = "feed";

pub fn user_key(id: &str) -> String {
    format!("user:{}", id)
}

pub fn username_key(username: &str) -> String {
    format!("username:{}", username)
}

pub fn token_key(token: &str) -> String {
    format!("token:{}", token)
}

pub fn profile_key(id: &str) -> String {
    format!("profile:{}", id)
}

pub fn profile_by_user_key(user_id: &str) -> String {
    format!("profile_by_user:{}", user_id)
}

pub fn post_key(id: &str) -> String {
    format!("post:{}", id)
}

// === Environment ===
pub fn token_expiration_hours() -> i64 {
    try_load("SOCIALHUB_TOKEN_EXPIRATION_HOURS", "24")
}

pub fn seed_demo_data() -> bool {
    try_load::<Flag>("SOCIALHUB_SEED_DEMO", "false").0
}

/// Boolean env value; also accepts `1`/`0` and `yes`/`no`.
struct Flag(bool);

impl FromStr for Flag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(Flag(true)),
            "false" | "0" | "no" => Ok(Flag(false)),
            other => Err(format!("expected true or false, got {other:?}")),
        }
    }
}

/// Settings for the native actix-web server.
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub seed_demo_data: bool,
}

impl ServerConfig {
    pub fn load() -> Self {
        Self {
            bind_addr: try_load("SOCIALHUB_BIND_ADDR", "127.0.0.1:3000"),
            seed_demo_data: seed_demo_data(),
        }
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    // token expiry is read on every request
    let raw = env::var(key).unwrap_or_else(|_| {
        debug!("{key} not set, using default: {default}");
        default.to_string()
    });

    match raw.parse() {
        Ok(value) => value,
        Err(e) => {
            warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
            match default.parse() {
                Ok(value) => value,
                Err(_) => unreachable!("default for {key} must parse"),
            }
        }
    }
}
