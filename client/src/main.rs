use clap::Parser;
use client::args::Args;
use client::Client;
use log::{error, info};
use shared::Message;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let ping = Message::new(args.timestamp, args.character)?;

    let client = Client::new(&args.host, args.port).await?;
    client.ping(&ping).await?;

    if args.no_listen {
        return Ok(());
    }

    info!("Listening for relayed messages, press Ctrl+C to stop");
    client
        .listen(
            async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!("Unable to listen for Ctrl+C: {}", e);
                }
            },
            |message| println!("{}", message),
        )
        .await;

    Ok(())
}
