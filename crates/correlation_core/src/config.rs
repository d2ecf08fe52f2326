//! Process configuration.
//!
//! Every option is a command line flag that falls back to the environment
//! variable of the same name in upper case (`--log_level` / `LOG_LEVEL`). The
//! value is parsed once at startup and handed to the components that need it.
use std::{net::SocketAddr, path::PathBuf, time::Duration};

use clap::{Parser, ValueEnum};

/// Default port of the correlation gRPC service.
pub const DEFAULT_PORT: u16 = 9090;

/// Default bound on channel establishment for clients.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 500;

/// Default deadline of a single client call.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 2000;

pub const DEFAULT_RESOURCE_MAPPING_FILE: &str = "/data/resource_mapping.yaml";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Serve correlation lookups
    #[default]
    Server,
    /// Resolve every mapped path against a running server
    Client,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Compact human readable lines
    #[default]
    Line,
    /// One JSON object per event
    Json,
}

#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "correlation-service")]
#[command(version, about = "Server/client for the correlation service")]
pub struct Config {
    /// Run mode
    #[arg(long, env = "MODE", value_enum, default_value_t = Mode::Server)]
    pub mode: Mode,

    /// Host of the correlation server, used in client mode
    #[arg(long, env = "HOST", default_value = "localhost")]
    pub host: String,

    /// Port to listen on (server) or connect to (client)
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long = "log_level", env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log format
    #[arg(long = "log_format", env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Line)]
    pub log_format: LogFormat,

    /// YAML file with the resource mapping
    #[arg(
        long = "resource_mapping_file",
        env = "RESOURCE_MAPPING_FILE",
        default_value = DEFAULT_RESOURCE_MAPPING_FILE
    )]
    pub resource_mapping_file: PathBuf,

    /// Client connection establishment timeout, in milliseconds
    #[arg(long = "connect_timeout_ms", env = "CONNECT_TIMEOUT_MS", default_value_t = DEFAULT_CONNECT_TIMEOUT_MS)]
    pub connect_timeout_ms: u64,

    /// Client per-call deadline, in milliseconds
    #[arg(long = "request_timeout_ms", env = "REQUEST_TIMEOUT_MS", default_value_t = DEFAULT_REQUEST_TIMEOUT_MS)]
    pub request_timeout_ms: u64,

    /// PEM certificate served by the server, enables TLS together with `tls_key`
    #[arg(long = "tls_cert", env = "TLS_CERT", requires = "tls_key")]
    pub tls_cert: Option<PathBuf>,

    /// PEM private key of the server certificate
    #[arg(long = "tls_key", env = "TLS_KEY", requires = "tls_cert")]
    pub tls_key: Option<PathBuf>,

    /// PEM CA certificate trusted by the client, enables TLS on the client side
    #[arg(long = "tls_ca", env = "TLS_CA")]
    pub tls_ca: Option<PathBuf>,

    /// Enable gRPC reflection on the server
    #[arg(long, env = "REFLECTION", default_value_t = false)]
    pub reflection: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
            resource_mapping_file: PathBuf::from(DEFAULT_RESOURCE_MAPPING_FILE),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            tls_cert: None,
            tls_key: None,
            tls_ca: None,
            reflection: false,
        }
    }
}

impl Config {
    /// Address the server binds to, on all interfaces.
    pub fn listen_address(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }

    /// URL clients connect to.
    pub fn endpoint_url(&self) -> String {
        let scheme = if self.tls_ca.is_some() { "https" } else { "http" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Whether the server is configured to terminate TLS.
    pub fn server_tls(&self) -> bool {
        self.tls_cert.is_some() && self.tls_key.is_some()
    }
}
