#![deny(warnings)]
#![deny(clippy::unwrap_used)]

use std::time::Duration;

use dotenv::dotenv;
use ssh_sftp::Session;
use ssh_sftp::ssh::config::{ConnectionConfig, resolve_probe_delay_secs};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("info".parse().expect("valid directive")),
        )
        .init();

    let count: u32 = match std::env::args().nth(1) {
        Some(arg) => arg
            .parse()
            .map_err(|e| format!("Invalid test count '{}': {}", arg, e))?,
        None => 1,
    };
    let delay = Duration::from_secs(resolve_probe_delay_secs(None));
    let config = ConnectionConfig::from_env()?;

    info!(
        "Probing {}:{} {} time(s), {}s apart",
        config.host(),
        config.port(),
        count,
        delay.as_secs()
    );

    let mut session = Session::new(config);
    for i in 1..=count {
        println!("=========Test count: {}==========", i);

        match session.connect().await {
            Ok(()) => println!("Success Connection."),
            Err(e) => println!("{}", e),
        }

        session.disconnect().await;
        if session.is_connected() {
            println!("Still connected.");
        } else {
            println!("Connection disconnected.");
        }

        if i < count {
            tokio::time::sleep(delay).await;
        }
    }

    Ok(())
}
