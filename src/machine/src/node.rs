/// Node identity — everything needed to open a machine handle to one host.
use serde::{Deserialize, Serialize};

fn default_port() -> u16 {
    22
}

fn default_username() -> String {
    "root".to_string()
}

/// Target host descriptor supplied by the wizard/controller layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    /// IP address or resolvable hostname.
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_username")]
    pub username: String,
    pub auth: NodeAuth,
}

/// Authentication material for one node. Supplied per node by the caller;
/// never persisted by this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeAuth {
    Password {
        password: String,
    },
    /// Private key contents (OpenSSH PEM) held in memory.
    PrivateKey {
        key: String,
        #[serde(default)]
        passphrase: Option<String>,
    },
}

impl Node {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
