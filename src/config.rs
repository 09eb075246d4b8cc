//! Provides the CLI option parser
//!
//! Used to parse the argv/config file into a struct that
//! the server can consume and use as configuration data.

use clap::{App, Arg};
use error::Error;
use std::fs::File;
use std::io::Read;
use toml;

const VERSION: Option<&'static str> = option_env!("CARGO_PKG_VERSION");

fn default_version() -> String {
    VERSION.unwrap_or("unknown").to_string()
}

/// Configuration for the tricorder executable
///
/// Please see `parse_args` in this module for how this is built.
#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    /// The host the health endpoints bind to.
    pub health_host: String,
    /// The port the health endpoints bind to. 0 picks an ephemeral port.
    pub health_port: u16,
    /// Whether the process reports ready as soon as the server is up.
    pub ready_on_start: bool,
    /// The verbosity setting. The higher the value the more chatty tricorder
    /// gets.
    pub verbose: u64,
    /// Tricorder version string. This is set automatically.
    pub version: String,
}

impl Default for Args {
    fn default() -> Self {
        Args {
            health_host: "0.0.0.0".to_string(),
            health_port: 8080,
            ready_on_start: true,
            verbose: 0,
            version: default_version(),
        }
    }
}

impl Args {
    /// The `host:port` pair the health server binds.
    pub fn health_addr(&self) -> String {
        format!("{}:{}", self.health_host, self.health_port)
    }
}

/// Parse the tricorder configuration arguments
///
/// This function will read the environment arguments and construct an
/// `Args`. The config file is optional; without one every setting takes its
/// default. See `tricorder --help` for more information.
pub fn parse_args() -> Result<Args, Error> {
    let args = App::new("tricorder")
        .version(VERSION.unwrap_or("unknown"))
        .about("metric value model and health endpoints")
        .arg(
            Arg::with_name("config-file")
                .long("config")
                .short("C")
                .value_name("config")
                .help("The config file to feed in.")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .multiple(true)
                .help("Turn on verbose output."),
        )
        .get_matches();

    let verb = args.occurrences_of("verbose");

    match args.value_of("config-file") {
        Some(filename) => {
            let mut fp = File::open(filename)?;
            let mut buffer = String::new();
            fp.read_to_string(&mut buffer)?;
            parse_config_file(&buffer, verb)
        }
        None => Ok(Args {
            verbose: verb,
            ..Args::default()
        }),
    }
}

/// Parse the tricorder configuration file.
///
/// ```toml
/// ready-on-start = false
///
/// [health]
/// host = "127.0.0.1"
/// port = 9090
/// ```
pub fn parse_config_file(buffer: &str, verbosity: u64) -> Result<Args, Error> {
    let mut args = Args::default();
    let value: toml::Value = toml::from_str(buffer)
        .map_err(|e| Error::Config(format!("could not parse config file: {}", e)))?;

    args.verbose = verbosity;

    args.ready_on_start = match value.get("ready-on-start") {
        Some(v) => v.as_bool()
            .ok_or_else(|| Error::Config("ready-on-start must be a boolean".to_string()))?,
        None => args.ready_on_start,
    };

    if let Some(health) = value.get("health") {
        if !health.is_table() {
            return Err(Error::Config("health must be a table".to_string()));
        }
        if let Some(host) = health.get("host") {
            args.health_host = host.as_str()
                .ok_or_else(|| Error::Config("health.host must be a string".to_string()))?
                .to_string();
        }
        if let Some(port) = health.get("port") {
            let port = port.as_integer()
                .ok_or_else(|| Error::Config("health.port must be an integer".to_string()))?;
            if port < 0 || port > i64::from(u16::max_value()) {
                return Err(Error::Config(format!("health.port {} out of range", port)));
            }
            args.health_port = port as u16;
        }
    }

    Ok(args)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn config_file_defaults() {
        let args = parse_config_file("", 4).unwrap();
        assert_eq!(args.health_host, "0.0.0.0");
        assert_eq!(args.health_port, 8080);
        assert!(args.ready_on_start);
        assert_eq!(args.verbose, 4);
        assert_eq!(args.health_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn config_file_health() {
        let config = r#"
ready-on-start = false

[health]
host = "127.0.0.1"
port = 9090
"#;
        let args = parse_config_file(config, 0).unwrap();
        assert_eq!(args.health_host, "127.0.0.1");
        assert_eq!(args.health_port, 9090);
        assert!(!args.ready_on_start);
    }

    #[test]
    fn config_file_partial_health() {
        let config = r#"
[health]
port = 0
"#;
        let args = parse_config_file(config, 0).unwrap();
        assert_eq!(args.health_host, "0.0.0.0");
        assert_eq!(args.health_port, 0);
    }

    #[test]
    fn config_file_bad_values() {
        for config in &[
            "ready-on-start = \"yes\"",
            "[health]\nport = 70000",
            "[health]\nport = \"80\"",
            "[health]\nhost = 1",
            "health = 3",
            "this is not toml",
        ] {
            match parse_config_file(config, 0) {
                Err(Error::Config(_)) => {}
                other => panic!("{:?} gave {:?}", config, other),
            }
        }
    }
}
