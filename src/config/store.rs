/// Local persistence: config directory, nodepool.json and kubeconfig paths
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use crate::error::{OkeError, OkeResult};
use crate::oke::models::NodePool;

/// Default config directory name, resolved next to the okectl executable
pub const DEFAULT_CONFIG_DIR: &str = ".okectl";
pub const NODE_POOL_FILE: &str = "nodepool.json";
pub const KUBECONFIG_FILE: &str = "kubeconfig";

/// Prepared output directory
#[derive(Debug, Clone)]
pub struct ConfigDir {
    path: PathBuf,
}

impl ConfigDir {
    /// Resolve and prepare the config directory
    ///
    /// The default directory lives beside the executable and is created on
    /// demand; `fresh` wipes it first. A custom directory must already exist.
    pub fn prepare(config_dir: &Path, fresh: bool) -> OkeResult<Self> {
        if config_dir == Path::new(DEFAULT_CONFIG_DIR) {
            let exe = std::env::current_exe()?;
            let base = exe.parent().unwrap_or_else(|| Path::new("."));
            return Self::prepare_default(&base.join(DEFAULT_CONFIG_DIR), fresh);
        }

        if config_dir.is_dir() {
            debug!("Using config directory {}", config_dir.display());
            Ok(Self {
                path: config_dir.to_path_buf(),
            })
        } else {
            Err(OkeError::MissingInput(format!(
                "Directory --config-dir not found: {}",
                config_dir.display()
            )))
        }
    }

    fn prepare_default(path: &Path, fresh: bool) -> OkeResult<Self> {
        if fresh {
            match std::fs::remove_dir_all(path) {
                Ok(()) => info!("Cleaned up config directory {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        std::fs::create_dir_all(path)?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn node_pool_store(&self) -> NodePoolStore {
        NodePoolStore::new(self.path.join(NODE_POOL_FILE))
    }

    pub fn kubeconfig_path(&self) -> PathBuf {
        self.path.join(KUBECONFIG_FILE)
    }
}

/// Which identifier to pull out of a stored descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorField {
    NodePoolId,
    ClusterId,
}

impl DescriptorField {
    fn flag(&self) -> &'static str {
        match self {
            DescriptorField::NodePoolId => "--node-pool-id",
            DescriptorField::ClusterId => "--cluster-id",
        }
    }

    fn key(&self) -> &'static str {
        match self {
            DescriptorField::NodePoolId => "id",
            DescriptorField::ClusterId => "clusterId",
        }
    }
}

/// nodepool.json reader/writer
#[derive(Debug, Clone)]
pub struct NodePoolStore {
    path: PathBuf,
}

impl NodePoolStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the descriptor with tab-indented JSON
    pub fn write(&self, node_pool: &NodePool) -> OkeResult<()> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        node_pool.serialize(&mut ser)?;

        std::fs::write(&self.path, buf)?;
        debug!("Wrote {}", self.path.display());
        Ok(())
    }

    pub fn read(&self) -> OkeResult<NodePool> {
        let content = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Descriptor text exactly as stored
    pub fn read_raw(&self) -> OkeResult<String> {
        Ok(std::fs::read_to_string(&self.path)?)
    }

    /// Pick the identifier from the flag if set, otherwise from the stored descriptor
    pub fn resolve(&self, flag: Option<&str>, field: DescriptorField) -> OkeResult<String> {
        if let Some(value) = flag.filter(|v| !v.is_empty()) {
            return Ok(value.to_string());
        }

        let node_pool = self.read().map_err(|e| {
            OkeError::MissingInput(format!(
                "No {} flag provided, error reading {}: {}",
                field.flag(),
                self.path.display(),
                e
            ))
        })?;

        let value = match field {
            DescriptorField::NodePoolId => node_pool.id,
            DescriptorField::ClusterId => node_pool.cluster_id,
        };

        if value.is_empty() {
            warn!(
                "{} has no usable \"{}\" field",
                self.path.display(),
                field.key()
            );
            return Err(OkeError::MissingInput(format!(
                "No {} flag provided and {} carries no \"{}\"",
                field.flag(),
                self.path.display(),
                field.key()
            )));
        }

        info!(
            "Using {} {} from {}",
            field.key(),
            value,
            self.path.display()
        );
        Ok(value)
    }
}

fn ipv4_pattern() -> &'static Regex {
    static IPV4: OnceLock<Regex> = OnceLock::new();
    IPV4.get_or_init(|| {
        let octet = "(25[0-5]|2[0-4][0-9]|1[0-9][0-9]|[1-9]?[0-9])";
        let pattern = format!("{o}\\.{o}\\.{o}\\.{o}", o = octet);
        Regex::new(&pattern).expect("IPv4 pattern is valid")
    })
}

/// First dotted-quad substring with every octet in 0-255
pub fn find_ip(input: &str) -> Option<&str> {
    ipv4_pattern().find(input).map(|m| m.as_str())
}

/// First worker node public IP in the descriptor, or empty if none
pub fn worker_node_ip(node_pool: &NodePool) -> String {
    node_pool
        .nodes
        .iter()
        .filter_map(|n| n.public_ip.as_deref())
        .find_map(find_ip)
        .unwrap_or_default()
        .to_string()
}
