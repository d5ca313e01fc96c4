//! Command-line arguments of the ping client.

use clap::Parser;
use shared::{is_proper_timestamp, DEFAULT_PORT, MAX_TIMESTAMP};

#[derive(Parser, Debug)]
#[command(author, version, about = "Pings the relay server and prints relayed messages")]
pub struct Args {
    /// Timestamp sent in the ping (seconds since epoch)
    #[arg(value_parser = parse_timestamp)]
    pub timestamp: u64,

    /// Single character sent in the ping
    #[arg(value_parser = parse_character)]
    pub character: u8,

    /// Server to connect to
    pub host: String,

    /// Server port
    #[arg(default_value_t = DEFAULT_PORT, value_parser = clap::value_parser!(u16).range(1..))]
    pub port: u16,

    /// Send the ping and exit instead of listening for relayed messages
    #[arg(long)]
    pub no_listen: bool,
}

pub fn parse_timestamp(input: &str) -> Result<u64, String> {
    let timestamp: u64 = input
        .parse()
        .map_err(|_| format!("'{}' is not a valid timestamp", input))?;

    if !is_proper_timestamp(timestamp) {
        return Err(format!("timestamp must not exceed {}", MAX_TIMESTAMP));
    }
    Ok(timestamp)
}

pub fn parse_character(input: &str) -> Result<u8, String> {
    match input.as_bytes() {
        [byte] => Ok(*byte),
        _ => Err(format!("'{}' is not a single character", input)),
    }
}
