//! Service class provider and user configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// What to do when a C-STORE carries an already stored
/// SOP instance UID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Refuse the store with a duplicate-instance status.
    Reject,
    /// Replace the stored object and its index record.
    Overwrite,
    /// Keep both objects; the new file gets a numbered name.
    KeepBothRename,
}

impl Default for DuplicatePolicy {
    fn default() -> Self {
        DuplicatePolicy::Overwrite
    }
}

/// The severity at which IOD validation findings block a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationGate {
    /// only hard errors refuse the object
    Error,
    /// warnings refuse the object too
    Warning,
}

impl Default for ValidationGate {
    fn default() -> Self {
        ValidationGate::Error
    }
}

/// TLS material for the transport wrapper.
///
/// The transport itself is terminated outside this crate;
/// these paths are handed through to the embedding application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsFiles {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub trust_path: Option<PathBuf>,
}

/// A C-MOVE destination known to this node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveDestination {
    pub ae_title: String,
    pub host: String,
    pub port: u16,
}

impl MoveDestination {
    /// The socket address of the destination.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration of the service class provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScpConfig {
    /// the AE title this node answers to
    pub ae_title: String,
    pub bind_host: String,
    pub port: u16,
    /// where stored objects land
    pub storage_root: PathBuf,
    /// `<root>/<patient>/<study>/<series>/<sop>.dcm` when on,
    /// a flat `<root>/<sop>.dcm` otherwise
    pub organize_folders: bool,
    /// calling AE titles given clearance; empty means any
    pub allowed_peer_ae_titles: Vec<String>,
    pub tls: Option<TlsFiles>,
    pub connect_timeout_secs: u64,
    pub artim_timeout_secs: u64,
    pub dimse_timeout_secs: u64,
    pub max_pdu_size: u32,
    pub duplicate_policy: DuplicatePolicy,
    pub validation_gate: ValidationGate,
    /// known C-MOVE destinations, by AE title
    pub move_destinations: Vec<MoveDestination>,
    /// path of the index journal; defaults next to the storage root
    pub index_journal: Option<PathBuf>,
}

impl Default for ScpConfig {
    fn default() -> Self {
        ScpConfig {
            ae_title: "MAIN-PACS".to_string(),
            bind_host: "0.0.0.0".to_string(),
            port: 11112,
            storage_root: PathBuf::from("./storage"),
            organize_folders: true,
            allowed_peer_ae_titles: Vec::new(),
            tls: None,
            connect_timeout_secs: 10,
            artim_timeout_secs: 30,
            dimse_timeout_secs: 60,
            max_pdu_size: pacs_ul::pdu::DEFAULT_MAX_PDU,
            duplicate_policy: DuplicatePolicy::default(),
            validation_gate: ValidationGate::default(),
            move_destinations: Vec::new(),
            index_journal: None,
        }
    }
}

impl ScpConfig {
    /// The socket address to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }

    pub fn artim_timeout(&self) -> Duration {
        Duration::from_secs(self.artim_timeout_secs)
    }

    pub fn dimse_timeout(&self) -> Duration {
        Duration::from_secs(self.dimse_timeout_secs)
    }

    /// Resolve a C-MOVE destination AE title.
    pub fn move_destination(&self, ae_title: &str) -> Option<&MoveDestination> {
        self.move_destinations
            .iter()
            .find(|dest| dest.ae_title == ae_title)
    }
}

/// Configuration of an outgoing association
/// (storage sub-operations, echo checks).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScuConfig {
    pub calling_ae: String,
    pub called_ae: String,
    pub host: String,
    pub port: u16,
    pub connect_timeout_secs: u64,
    pub dimse_timeout_secs: u64,
    pub max_pdu_size: u32,
    pub tls: Option<TlsFiles>,
    /// proposed presentation contexts:
    /// abstract syntax with its transfer syntax menu
    pub proposed_contexts: Vec<(String, Vec<String>)>,
}

impl Default for ScuConfig {
    fn default() -> Self {
        ScuConfig {
            calling_ae: "PACS-SCU".to_string(),
            called_ae: "ANY-SCP".to_string(),
            host: "127.0.0.1".to_string(),
            port: 104,
            connect_timeout_secs: 10,
            dimse_timeout_secs: 60,
            max_pdu_size: pacs_ul::pdu::DEFAULT_MAX_PDU,
            tls: None,
            proposed_contexts: Vec::new(),
        }
    }
}

impl ScuConfig {
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn dimse_timeout(&self) -> Duration {
        Duration::from_secs(self.dimse_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::{DuplicatePolicy, ScpConfig};

    #[test]
    fn defaults_are_sensible() {
        let config = ScpConfig::default();
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Overwrite);
        assert!(config.organize_folders);
        assert!(config.allowed_peer_ae_titles.is_empty());
        assert_eq!(config.bind_addr(), "0.0.0.0:11112");
    }

    #[test]
    fn config_round_trips_through_json() {
        let mut config = ScpConfig::default();
        config.ae_title = "TEST-SCP".to_string();
        config.duplicate_policy = DuplicatePolicy::Reject;
        let json = serde_json::to_string(&config).unwrap();
        let back: ScpConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.ae_title, "TEST-SCP");
        assert_eq!(back.duplicate_policy, DuplicatePolicy::Reject);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let back: ScpConfig = serde_json::from_str(r#"{"ae_title":"X"}"#).unwrap();
        assert_eq!(back.ae_title, "X");
        assert_eq!(back.port, 11112);
    }
}
