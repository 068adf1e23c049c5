use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use textserve::config::{AppState, Config};
use textserve::logger;
use textserve::server::{create_reusable_listener, install_shutdown_handler, start_server_loop};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config::load()?;

    // Build the Tokio runtime, honoring the configured worker count
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }

    let runtime = runtime_builder.build()?;
    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    logger::init(&cfg)?;

    let addr = cfg.get_socket_addr()?;
    let listener = create_reusable_listener(addr)?;

    let state = Arc::new(AppState::new(cfg)?);
    let active_connections = Arc::new(AtomicUsize::new(0));

    logger::log_server_start(&addr, &state.config, state.base_dir());

    let shutdown = install_shutdown_handler();

    // LocalSet so connection tasks can use spawn_local
    let local = tokio::task::LocalSet::new();
    local
        .run_until(start_server_loop(
            listener,
            state,
            active_connections,
            shutdown,
        ))
        .await;

    Ok(())
}
