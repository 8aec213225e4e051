// Image upscaler web server
use std::convert::Infallible;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use hyper::service::{make_service_fn, service_fn};
use hyper::Server;

use upscale_web::sys_info;
use upscale_web::web::housekeeping::spawn_janitor;
use upscale_web::web::logger::setup_logging;
use upscale_web::web::{handle_request, AppState, Args, Config};

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        sys_info!("[SHUTDOWN] Ctrl-C received, draining connections");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::load(&args).context("failed to load configuration")?;

    if let Err(e) = setup_logging(&config.log_dir, config.log_level_filter()?) {
        eprintln!("Failed to set up logging: {e}");
    }

    let state = Arc::new(AppState::new(config).context("failed to initialise server state")?);
    let _janitor = spawn_janitor(state.clone());

    // Create HTTP service
    let make_svc = make_service_fn({
        let state = state.clone();
        move |_conn| {
            let state = state.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |req| handle_request(req, state.clone())))
            }
        }
    });

    // Start server
    let addr = state.config.bind;
    let server = Server::try_bind(&addr)
        .with_context(|| format!("failed to bind {addr}"))?
        .serve(make_svc)
        .with_graceful_shutdown(shutdown_signal());

    sys_info!("[STARTUP] Image upscaler listening on http://{}", addr);
    println!("Image upscaler web server starting on http://{addr}");
    println!("Available endpoints:");
    println!("  GET       /                    - Upload form (runs cleanup)");
    println!("  POST      /upload              - Upload and upscale an image");
    println!("  GET       /result/<file>       - Compare original and upscaled image");
    println!("  GET       /download/<file>     - Download the upscaled image");
    println!("  GET|POST  /cleanup             - Delete stored images");
    println!("  GET       /static/...          - Static files, uploads and outputs");
    println!("  GET       /health              - Health check");

    server.await.context("server error")?;

    Ok(())
}
