//! Profiles and posts REST backend.
//!
//! The same [`router::route`] serves the Spin HTTP component (wasm32, backed
//! by the Spin key-value store) and the native actix-web server in
//! [`server`] (backed by [`core::store::MemoryStore`]).

pub mod auth;
pub mod config;
pub mod core;
pub mod follow;
pub mod models;
pub mod permissions;
pub mod posts;
pub mod profiles;
pub mod router;
pub mod serializers;
pub mod users;

#[cfg(not(target_arch = "wasm32"))]
pub mod server;

#[cfg(target_arch = "wasm32")]
mod component {
    use spin_sdk::http::{IntoResponse, Request};
    use spin_sdk::http_component;
    use spin_sdk::key_value::Store;

    use crate::config::seed_demo_data;
    use crate::core::db::init_demo_data;
    use crate::router::route;

    // === Component entrypoint ===
    #[http_component]
    fn handle(req: Request) -> anyhow::Result<impl IntoResponse> {
        let store = Store::open_default()
            .map_err(|e| anyhow::anyhow!("open default key-value store: {:?}", e))?;

        if seed_demo_data() {
            init_demo_data(&store)?;
        }

        Ok(route(&store, &req))
    }
}
