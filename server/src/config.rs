use std::io::Read;

use serde::{Deserialize, Serialize};

/// Minimum number of seats before a game may start.
pub const MIN_PLAYERS: usize = 2;
/// Maximum seats per room.
pub const MAX_PLAYERS: usize = 8;

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "defaults::port")]
    pub server_port: u16,
    /// How long bots pretend to think before acting, in milliseconds.
    #[serde(default = "defaults::bot_think_millis")]
    pub bot_think_millis: u64,
}

pub mod defaults {
    pub const fn port() -> u16 {
        25580
    }

    pub const fn bot_think_millis() -> u64 {
        1500
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: defaults::port(),
            bot_think_millis: defaults::bot_think_millis(),
        }
    }
}

const DEFAULT_CONFIG_PATH: &str = "./Server.toml";

pub fn load() -> anyhow::Result<Config> {
    let mut file = std::fs::File::options()
        .read(true)
        .open(DEFAULT_CONFIG_PATH)?;

    let mut contents = String::new();
    file.read_to_string(&mut contents)?;

    let config = toml::from_str(&contents)?;

    Ok(config)
}
