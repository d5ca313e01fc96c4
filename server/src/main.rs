use clap::Parser;
use log::{error, info};
use server::config::Args;
use server::network::Server;

/// Main-method of the application.
/// Parses command-line arguments, runs the event loop on a blocking thread and
/// stops it on Ctrl+C.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let config = args.into_config()?;

    let mut server = Server::bind(config)?;
    let shutdown = server.shutdown_handle();

    let mut event_loop = tokio::task::spawn_blocking(move || server.run());

    tokio::select! {
        result = &mut event_loop => {
            result??;
        }
        signal = tokio::signal::ctrl_c() => {
            match &signal {
                Ok(()) => info!("Received Ctrl+C, shutting down gracefully..."),
                Err(e) => error!("Unable to listen for Ctrl+C: {}", e),
            }
            shutdown.stop();
            event_loop.await??;
            signal?;
        }
    }

    Ok(())
}
