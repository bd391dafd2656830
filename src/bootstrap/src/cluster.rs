//! Cluster-wide parameters supplied by the wizard/controller layer.
//!
//! Covers the init/deploy inputs: package mirror, target Kubernetes
//! version, image repository, service subnet, bootstrap token, and the
//! control-plane endpoint selection mode.

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::StructuredError;

/// Default port of the Kubernetes API server.
pub const KUBE_API_PORT: u16 = 6443;

fn default_image_repository() -> String {
    "registry.k8s.io".to_string()
}

fn default_service_subnet() -> String {
    "10.96.0.0/12".to_string()
}

/// How worker/join operations reach the API server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityMode {
    /// Directly via the first master's IP.
    #[default]
    FirstMaster,
    /// Via a keepalived-managed virtual IP.
    VirtualIp,
    /// Via an external load balancer.
    LoadBalancer,
}

/// Resolved control-plane endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Package mirror base URL used by the toolchain install script.
    #[serde(default)]
    pub mirror: String,

    #[serde(default)]
    pub kubernetes_version: String,

    #[serde(default = "default_image_repository")]
    pub image_repository: String,

    /// Service CIDR, e.g. `10.96.0.0/12`.
    #[serde(default = "default_service_subnet")]
    pub service_subnet: String,

    /// Shared kubeadm bootstrap token.
    #[serde(default)]
    pub bootstrap_token: String,

    #[serde(default)]
    pub connectivity: ConnectivityMode,

    /// Master node IPs, in provisioning order.
    #[serde(default)]
    pub masters: Vec<String>,

    #[serde(default)]
    pub virtual_ip: String,

    /// Load balancer address as `ip` or `ip:port`.
    #[serde(default)]
    pub load_balancer: String,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        ClusterConfig {
            mirror: String::new(),
            kubernetes_version: String::new(),
            image_repository: default_image_repository(),
            service_subnet: default_service_subnet(),
            bootstrap_token: String::new(),
            connectivity: ConnectivityMode::default(),
            masters: Vec::new(),
            virtual_ip: String::new(),
            load_balancer: String::new(),
        }
    }
}

impl ClusterConfig {
    /// Load configuration from the first `cluster.toml` found among the
    /// usual locations, falling back to defaults.
    pub fn load(app_dir: &Path) -> Result<ClusterConfig, StructuredError> {
        let candidates = vec![
            PathBuf::from("cluster.toml"),
            app_dir.join("cluster.toml"),
        ];

        for path in candidates {
            if path.exists() {
                let content = std::fs::read_to_string(&path).map_err(|e| {
                    StructuredError::new(
                        "Load cluster config error",
                        format!("failed to read {}: {e}", path.display()),
                    )
                })?;
                let config: ClusterConfig = toml::from_str(&content).map_err(|e| {
                    StructuredError::new(
                        "Load cluster config error",
                        format!("failed to parse {}: {e}", path.display()),
                    )
                })?;
                tracing::info!("[ClusterConfig] Loaded from {}", path.display());
                return Ok(config);
            }
        }

        tracing::warn!("[ClusterConfig] No cluster.toml found, using defaults");
        Ok(ClusterConfig::default())
    }

    /// Resolve the address join operations use to reach the API server,
    /// according to the connectivity mode.
    pub fn control_plane_endpoint(&self) -> Result<Endpoint, StructuredError> {
        match self.connectivity {
            ConnectivityMode::FirstMaster => match self.masters.first() {
                Some(ip) if !ip.is_empty() => Ok(Endpoint {
                    host: ip.clone(),
                    port: KUBE_API_PORT,
                }),
                _ => Err(StructuredError::invalid_parameter(
                    "no master node configured for first-master connectivity",
                )),
            },
            ConnectivityMode::VirtualIp => {
                if self.virtual_ip.is_empty() {
                    Err(StructuredError::invalid_parameter(
                        "virtual IP is empty for virtual-ip connectivity",
                    ))
                } else {
                    Ok(Endpoint {
                        host: self.virtual_ip.clone(),
                        port: KUBE_API_PORT,
                    })
                }
            }
            ConnectivityMode::LoadBalancer => {
                if self.load_balancer.is_empty() {
                    return Err(StructuredError::invalid_parameter(
                        "load balancer address is empty for load-balancer connectivity",
                    ));
                }
                match self.load_balancer.split_once(':') {
                    Some((host, port)) => {
                        let port = port.parse().map_err(|_| {
                            StructuredError::invalid_parameter(format!(
                                "load balancer port `{port}` is not a valid port number"
                            ))
                        })?;
                        Ok(Endpoint {
                            host: host.to_string(),
                            port,
                        })
                    }
                    None => Ok(Endpoint {
                        host: self.load_balancer.clone(),
                        port: KUBE_API_PORT,
                    }),
                }
            }
        }
    }

    /// Cluster DNS address: the 10th usable address of the service subnet.
    ///
    /// Fails (the init step surfaces the error) when the subnet cannot be
    /// parsed or is too small to contain a 10th usable address; the flag is
    /// never silently omitted.
    pub fn cluster_dns(&self) -> Result<String, StructuredError> {
        cluster_dns_of(&self.service_subnet)
    }
}

/// 10th usable address of an IPv4 CIDR. Usable addresses start right after
/// the network address.
pub fn cluster_dns_of(subnet: &str) -> Result<String, StructuredError> {
    let (addr_text, prefix_text) = subnet.split_once('/').ok_or_else(|| {
        StructuredError::invalid_parameter(format!("service subnet `{subnet}` is not CIDR notation"))
    })?;
    let addr: Ipv4Addr = addr_text.parse().map_err(|_| {
        StructuredError::invalid_parameter(format!(
            "service subnet `{subnet}` has an invalid IPv4 address"
        ))
    })?;
    let prefix: u32 = prefix_text.parse().map_err(|_| {
        StructuredError::invalid_parameter(format!(
            "service subnet `{subnet}` has an invalid prefix length"
        ))
    })?;
    if prefix > 32 {
        return Err(StructuredError::invalid_parameter(format!(
            "service subnet `{subnet}` has an invalid prefix length"
        )));
    }

    let usable = if prefix >= 31 {
        0
    } else {
        (1u64 << (32 - prefix)) - 2
    };
    if usable < 10 {
        return Err(StructuredError::invalid_parameter(format!(
            "service subnet `{subnet}` is too small to allocate a cluster DNS address"
        )));
    }

    let mask = if prefix == 0 { 0 } else { u32::MAX << (32 - prefix) };
    let network = u32::from(addr) & mask;
    Ok(Ipv4Addr::from(network + 10).to_string())
}
