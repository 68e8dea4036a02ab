#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::net::TcpListener;
    use std::sync::Arc;

    use anyhow::Context;
    use tracing::info;
    use tracing_subscriber::{fmt, EnvFilter};

    use socialhub::config::ServerConfig;
    use socialhub::core::db::init_demo_data;
    use socialhub::core::store::MemoryStore;

    pub async fn run() -> anyhow::Result<()> {
        fmt()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
            .init();

        let config = ServerConfig::load();
        let store = Arc::new(MemoryStore::new());

        if config.seed_demo_data {
            info!("Seeding demo data...");
            init_demo_data(store.as_ref()).context("seed demo data")?;
        }

        let listener = TcpListener::bind(config.bind_addr)
            .with_context(|| format!("bind {}", config.bind_addr))?;
        info!("Server listening on http://{}", config.bind_addr);

        socialhub::server::run(listener, store)
            .context("start server")?
            .await
            .context("server shutdown")?;

        info!("Server shutting down...");
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    native::run().await
}

#[cfg(target_arch = "wasm32")]
fn main() {}
