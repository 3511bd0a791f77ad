use std::sync::Arc;

mod config;
mod handler;
mod http;
mod logger;
mod provider;
mod server;
mod story;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = match config_path_arg(std::env::args().skip(1)) {
        Some(path) => config::Config::load_from(&path)?,
        None => config::Config::load()?,
    };
    logger::init(&cfg)?;

    // Worker threads default to the number of CPU cores
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let state = Arc::new(config::AppState::from_config(&cfg)?);
    let listener = server::create_reusable_listener(addr)?;

    let shutdown = Arc::new(server::ShutdownSignal::new());
    server::signal::start_signal_handler(Arc::clone(&shutdown));

    logger::log_server_start(&addr, &cfg);
    server::run_server_loop(listener, state, shutdown).await;
    Ok(())
}

/// Accepts `--config <path>`, `--config=<path>` or a bare path (without extension)
fn config_path_arg(mut args: impl Iterator<Item = String>) -> Option<String> {
    let first = args.next()?;
    if first == "--config" {
        return args.next();
    }
    if let Some(path) = first.strip_prefix("--config=") {
        return Some(path.to_string());
    }
    Some(first)
}
