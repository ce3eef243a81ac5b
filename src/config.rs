//! Command-line arguments and runtime settings

use std::time::Duration;

use clap::Parser;

/// Terminal client for the Music Player Daemon
#[derive(Debug, Parser)]
#[command(name = "mpdterm", version, about)]
pub struct Args {
    /// Server host name or address
    #[arg(long, env = "MPD_HOST", default_value = "localhost")]
    pub host: String,

    /// Server port
    #[arg(long, env = "MPD_PORT", default_value_t = 6600)]
    pub port: u16,

    /// Password sent right after connecting
    #[arg(short, long)]
    pub password: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    /// How often the loop wakes up without input or server changes
    pub update_interval: Duration,
    /// Pause between reconnect attempts while disconnected
    pub reconnect_interval: Duration,
    pub message_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6600,
            password: None,
            update_interval: Duration::from_secs(1),
            reconnect_interval: Duration::from_secs(5),
            message_timeout: Duration::from_secs(2),
        }
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            password: args.password,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_and_address_from_arguments() {
        let args = Args::try_parse_from(["mpdterm", "--host", "music.lan", "--port", "6601", "-p", "secret"]).unwrap();
        let config = Config::from(args);

        assert_eq!(config.host, "music.lan");
        assert_eq!(config.port, 6601);
        assert_eq!(config.password.as_deref(), Some("secret"));
        assert_eq!(config.message_timeout, Duration::from_secs(2));
    }

    #[test]
    fn rejects_a_non_numeric_port() {
        assert!(Args::try_parse_from(["mpdterm", "--port", "loud"]).is_err());
    }
}
