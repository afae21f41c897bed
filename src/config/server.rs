use serde::Deserialize;

/// Configuration for the REST API server.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Whether the REST API is started at all.
    #[serde(default)]
    pub enabled: bool,

    /// Address and port for the HTTP server to listen on.
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { enabled: false, listen_address: default_listen_address() }
    }
}

fn default_listen_address() -> String {
    "0.0.0.0:8080".to_string()
}
