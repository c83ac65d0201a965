//! Server command implementation

use std::path::Path;

use anyhow::Result;

use super::load_config;

pub async fn cmd_serve(config_path: Option<&Path>, host: &str, port: u16) -> Result<()> {
    let ingest = load_config(config_path, false)?;

    println!("🚀 Starting Tally web server...");
    println!("   Listening: http://{}:{}", host, port);
    println!("   Ambiguous dates: {}", ingest.dates.ambiguous_order);
    println!();
    println!("   Press Ctrl+C to stop");

    let config = tally_server::ServerConfig {
        ingest,
        allowed_origins: vec![],
    };
    tally_server::serve(config, host, port).await?;

    Ok(())
}
