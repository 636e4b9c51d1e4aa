//! VAnchor Configuration
//!
//! Shared configuration crate for anchor clients.
//!
//! Handles loading configuration from:
//! 1. VANCHOR_CONFIG env var (explicit path)
//! 2. ./anchor.toml (current directory)
//! 3. ~/.vanchor/anchor.toml (user home)
//!
//! Environment variables take precedence over TOML config.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;
use std::{env, fs};

use vanchor_proposals::{Address, ChainType, TypedChainId};

/// Global config instance for convenience access
pub static GLOBAL_CONFIG: OnceLock<AnchorConfig> = OnceLock::new();

const CONFIG_FILE_NAME: &str = "anchor.toml";
const CONFIG_DIR_NAME: &str = ".vanchor";

// ============================================================================
// Default Constants
// ============================================================================

pub const DEFAULT_TREE_LEVELS: usize = 30;
pub const DEFAULT_ROOT_HISTORY_SIZE: usize = 30;
pub const DEFAULT_IDENTITY_LEVELS: usize = 20;
pub const DEFAULT_MAX_EDGES: usize = 1;
pub const DEFAULT_N_INS_SMALL: usize = 2;
pub const DEFAULT_N_INS_LARGE: usize = 16;
pub const DEFAULT_N_OUTS: usize = 2;
pub const DEFAULT_ROOT_COUNT: usize = 2;
pub const DEFAULT_SECRET_LEN: usize = 31;
pub const DEFAULT_CHAIN_ID: u32 = 31337;
pub const DEFAULT_PROVER_TIMEOUT_SECS: u64 = 300;

const MAX_TREE_LEVELS: usize = 32;
const MAX_SECRET_LEN: usize = 31;

// ============================================================================
// Config Structs
// ============================================================================

/// Root configuration structure (matches TOML layout)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnchorConfig {
    #[serde(default)]
    pub tree: TreeConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub edges: EdgesConfig,
    #[serde(default)]
    pub circuit: CircuitConfig,
    #[serde(default)]
    pub notes: NotesConfig,
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub prover: ProverConfig,
}

/// Commitment accumulator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    #[serde(default = "default_tree_levels")]
    pub levels: usize,
    #[serde(default = "default_root_history")]
    pub root_history_size: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            levels: DEFAULT_TREE_LEVELS,
            root_history_size: DEFAULT_ROOT_HISTORY_SIZE,
        }
    }
}

fn default_tree_levels() -> usize {
    DEFAULT_TREE_LEVELS
}
fn default_root_history() -> usize {
    DEFAULT_ROOT_HISTORY_SIZE
}

/// Identity group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(default = "default_identity_levels")]
    pub levels: usize,
    #[serde(default = "default_root_history")]
    pub root_history_size: usize,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            levels: DEFAULT_IDENTITY_LEVELS,
            root_history_size: DEFAULT_ROOT_HISTORY_SIZE,
        }
    }
}

fn default_identity_levels() -> usize {
    DEFAULT_IDENTITY_LEVELS
}

/// Linked anchors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgesConfig {
    #[serde(default = "default_max_edges")]
    pub max_edges: usize,
    #[serde(default)]
    pub linked_chains: Vec<TypedChainId>,
}

impl Default for EdgesConfig {
    fn default() -> Self {
        Self {
            max_edges: DEFAULT_MAX_EDGES,
            linked_chains: Vec::new(),
        }
    }
}

fn default_max_edges() -> usize {
    DEFAULT_MAX_EDGES
}

/// Fixed circuit arities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitConfig {
    #[serde(default = "default_n_ins_small")]
    pub n_ins_small: usize,
    #[serde(default = "default_n_ins_large")]
    pub n_ins_large: usize,
    #[serde(default = "default_n_outs")]
    pub n_outs: usize,
    #[serde(default = "default_root_count")]
    pub identity_roots: usize,
    #[serde(default = "default_root_count")]
    pub vanchor_roots: usize,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            n_ins_small: DEFAULT_N_INS_SMALL,
            n_ins_large: DEFAULT_N_INS_LARGE,
            n_outs: DEFAULT_N_OUTS,
            identity_roots: DEFAULT_ROOT_COUNT,
            vanchor_roots: DEFAULT_ROOT_COUNT,
        }
    }
}

fn default_n_ins_small() -> usize {
    DEFAULT_N_INS_SMALL
}
fn default_n_ins_large() -> usize {
    DEFAULT_N_INS_LARGE
}
fn default_n_outs() -> usize {
    DEFAULT_N_OUTS
}
fn default_root_count() -> usize {
    DEFAULT_ROOT_COUNT
}

/// Random secret sizes (bytes, each at most 31)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotesConfig {
    #[serde(default = "default_secret_len")]
    pub secret_len: usize,
    #[serde(default = "default_secret_len")]
    pub blinding_len: usize,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            secret_len: DEFAULT_SECRET_LEN,
            blinding_len: DEFAULT_SECRET_LEN,
        }
    }
}

fn default_secret_len() -> usize {
    DEFAULT_SECRET_LEN
}

/// Local anchor deployment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    #[serde(default = "default_chain_type")]
    pub chain_type: ChainType,
    #[serde(default = "default_chain_id")]
    pub chain_id: u32,
    #[serde(default)]
    pub anchor_address: Address,
    /// Default wrap/unwrap token when a transaction names none
    #[serde(default)]
    pub token: Address,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_type: ChainType::Evm,
            chain_id: DEFAULT_CHAIN_ID,
            anchor_address: Address::ZERO,
            token: Address::ZERO,
        }
    }
}

impl ChainConfig {
    pub fn typed_chain_id(&self) -> TypedChainId {
        TypedChainId::new(self.chain_type, self.chain_id)
    }
}

fn default_chain_type() -> ChainType {
    ChainType::Evm
}
fn default_chain_id() -> u32 {
    DEFAULT_CHAIN_ID
}

/// Proof service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProverConfig {
    /// Upper bound on one proof generation; `None` waits indefinitely
    #[serde(default = "default_prover_timeout")]
    pub timeout_secs: Option<u64>,
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Some(DEFAULT_PROVER_TIMEOUT_SECS),
        }
    }
}

impl ProverConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

fn default_prover_timeout() -> Option<u64> {
    Some(DEFAULT_PROVER_TIMEOUT_SECS)
}

// ============================================================================
// Environment Variable Helpers
// ============================================================================

/// Set field from a variable if present and parseable
fn env_parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, field: &mut T) {
    if let Some(v) = lookup(key) {
        match v.parse() {
            Ok(parsed) => *field = parsed,
            Err(_) => log::warn!("Ignoring unparseable {}={}", key, v),
        }
    }
}

/// Set Option<T> from a variable if present and parseable
fn env_parse_option<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    field: &mut Option<T>,
) {
    if let Some(v) = lookup(key) {
        match v.parse() {
            Ok(parsed) => *field = Some(parsed),
            Err(_) => log::warn!("Ignoring unparseable {}={}", key, v),
        }
    }
}

/// Parse a comma-separated list of `<evm chain id>` values
fn parse_linked_chains(v: &str) -> Option<Vec<TypedChainId>> {
    v.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<u32>().ok().map(TypedChainId::evm))
        .collect()
}

// ============================================================================
// Implementation
// ============================================================================

impl AnchorConfig {
    /// Load configuration from config file with env var overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::find_config_file() {
            Some(path) => {
                log::info!("Loading config from: {}", path.display());
                let contents = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;
                toml::from_str(&contents)
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))?
            }
            None => {
                log::info!("No config file found, using defaults and environment variables");
                Self::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Find the config file path
    fn find_config_file() -> Option<PathBuf> {
        // 1. Check VANCHOR_CONFIG env var
        if let Ok(path) = env::var("VANCHOR_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. Check ./anchor.toml (current directory)
        let local_path = PathBuf::from(CONFIG_FILE_NAME);
        if local_path.exists() {
            return Some(local_path);
        }

        // 3. Check ~/.vanchor/anchor.toml
        Self::default_config_path().filter(|p| p.exists())
    }

    /// Apply process environment overrides
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(&|key: &str| env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        // Tree
        env_parse(lookup, "VANCHOR_TREE_LEVELS", &mut self.tree.levels);
        env_parse(lookup, "VANCHOR_ROOT_HISTORY", &mut self.tree.root_history_size);
        env_parse(lookup, "VANCHOR_IDENTITY_LEVELS", &mut self.identity.levels);

        // Edges
        env_parse(lookup, "VANCHOR_MAX_EDGES", &mut self.edges.max_edges);
        if let Some(v) = lookup("VANCHOR_LINKED_CHAINS") {
            match parse_linked_chains(&v) {
                Some(chains) => self.edges.linked_chains = chains,
                None => log::warn!("Ignoring unparseable VANCHOR_LINKED_CHAINS={}", v),
            }
        }

        // Notes
        env_parse(lookup, "VANCHOR_SECRET_LEN", &mut self.notes.secret_len);
        env_parse(lookup, "VANCHOR_BLINDING_LEN", &mut self.notes.blinding_len);

        // Chain
        env_parse(lookup, "VANCHOR_CHAIN_ID", &mut self.chain.chain_id);
        env_parse(lookup, "VANCHOR_ANCHOR_ADDRESS", &mut self.chain.anchor_address);
        env_parse(lookup, "VANCHOR_TOKEN", &mut self.chain.token);

        // Prover
        env_parse_option(lookup, "VANCHOR_PROVER_TIMEOUT_SECS", &mut self.prover.timeout_secs);
    }

    /// Reject combinations the circuits and ledger cannot accept
    pub fn validate(&self) -> Result<()> {
        for (name, levels) in [("tree", self.tree.levels), ("identity", self.identity.levels)] {
            if levels == 0 || levels > MAX_TREE_LEVELS {
                bail!("{name}.levels must be in 1..={MAX_TREE_LEVELS}, got {levels}");
            }
        }

        if self.tree.root_history_size == 0 {
            bail!("tree.root_history_size must be positive");
        }

        let roots = self.edges.max_edges + 1;
        if self.circuit.vanchor_roots != roots {
            bail!(
                "circuit.vanchor_roots ({}) must equal edges.max_edges + 1 ({roots})",
                self.circuit.vanchor_roots
            );
        }
        if self.circuit.identity_roots != roots {
            bail!(
                "circuit.identity_roots ({}) must equal edges.max_edges + 1 ({roots})",
                self.circuit.identity_roots
            );
        }

        if self.edges.linked_chains.len() > self.edges.max_edges {
            bail!(
                "{} linked chains configured but edges.max_edges is {}",
                self.edges.linked_chains.len(),
                self.edges.max_edges
            );
        }

        if self.circuit.n_ins_small == 0 || self.circuit.n_ins_small > self.circuit.n_ins_large {
            bail!(
                "circuit input arities must satisfy 0 < n_ins_small <= n_ins_large, got {} / {}",
                self.circuit.n_ins_small,
                self.circuit.n_ins_large
            );
        }

        // External data carries exactly two encrypted outputs
        if self.circuit.n_outs != DEFAULT_N_OUTS {
            bail!("circuit.n_outs must be {DEFAULT_N_OUTS}, got {}", self.circuit.n_outs);
        }

        for (name, len) in [
            ("notes.secret_len", self.notes.secret_len),
            ("notes.blinding_len", self.notes.blinding_len),
        ] {
            if len == 0 || len > MAX_SECRET_LEN {
                bail!("{name} must be in 1..={MAX_SECRET_LEN}, got {len}");
            }
        }

        if self.prover.timeout_secs == Some(0) {
            bail!("prover.timeout_secs must be positive when set");
        }

        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Generate a sample config file
    pub fn generate_sample() -> String {
        let mut sample = Self::default();
        sample.edges.linked_chains = vec![TypedChainId::evm(5001)];
        toml::to_string_pretty(&sample).unwrap_or_default()
    }

    /// Get the global config instance, initializing it if necessary.
    ///
    /// Falls back to defaults if loading fails.
    pub fn global() -> &'static AnchorConfig {
        GLOBAL_CONFIG.get_or_init(|| {
            Self::load().unwrap_or_else(|e| {
                log::warn!("Failed to load config: {}, using defaults", e);
                Self::default()
            })
        })
    }

    /// Try to get the global config instance.
    ///
    /// Returns `None` if config hasn't been initialized yet.
    pub fn try_global() -> Option<&'static AnchorConfig> {
        GLOBAL_CONFIG.get()
    }

    /// Initialize the global config with a specific instance.
    ///
    /// Returns `Err(config)` if already initialized.
    pub fn set_global(config: AnchorConfig) -> Result<(), AnchorConfig> {
        GLOBAL_CONFIG.set(config)
    }
}

/// Shorthand for `AnchorConfig::global()`.
#[inline]
pub fn global_config() -> &'static AnchorConfig {
    AnchorConfig::global()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AnchorConfig::default();
        assert_eq!(config.tree.levels, DEFAULT_TREE_LEVELS);
        assert_eq!(config.circuit.n_ins_small, 2);
        assert_eq!(config.circuit.n_ins_large, 16);
        assert_eq!(config.chain.typed_chain_id(), TypedChainId::evm(DEFAULT_CHAIN_ID));
        config.validate().unwrap();
    }

    #[test]
    fn test_generate_sample() {
        let sample = AnchorConfig::generate_sample();
        assert!(sample.contains("[tree]"));
        assert!(sample.contains("[circuit]"));
        assert!(sample.contains("[chain]"));
        assert!(sample.contains("linked_chains"));
    }

    #[test]
    fn test_parse_sample() {
        let sample = AnchorConfig::generate_sample();
        let parsed: AnchorConfig = toml::from_str(&sample).unwrap();
        assert_eq!(parsed.edges.linked_chains, vec![TypedChainId::evm(5001)]);
        parsed.validate().unwrap();
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[tree]
levels = 5

[chain]
chain_id = 5
anchor_address = "0x1111111111111111111111111111111111111111"
"#
        )
        .unwrap();

        let config = AnchorConfig::load_from(file.path()).unwrap();
        assert_eq!(config.tree.levels, 5);
        assert_eq!(config.tree.root_history_size, DEFAULT_ROOT_HISTORY_SIZE);
        assert_eq!(config.chain.anchor_address, Address([0x11; 20]));
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[tree]\nlevels = 40").unwrap();
        assert!(AnchorConfig::load_from(file.path()).is_err());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("VANCHOR_TREE_LEVELS", "8"),
            ("VANCHOR_LINKED_CHAINS", "5, 1337"),
            ("VANCHOR_PROVER_TIMEOUT_SECS", "15"),
            ("VANCHOR_MAX_EDGES", "not-a-number"),
        ]);
        let lookup = |key: &str| vars.get(key).map(|v| v.to_string());

        let mut config = AnchorConfig::default();
        config.apply_overrides(&lookup);

        assert_eq!(config.tree.levels, 8);
        assert_eq!(
            config.edges.linked_chains,
            vec![TypedChainId::evm(5), TypedChainId::evm(1337)]
        );
        assert_eq!(config.prover.timeout_secs, Some(15));
        assert_eq!(config.edges.max_edges, DEFAULT_MAX_EDGES);
    }

    #[test]
    fn test_validate_root_arity() {
        let mut config = AnchorConfig::default();
        config.edges.max_edges = 3;
        assert!(config.validate().is_err());

        config.circuit.vanchor_roots = 4;
        config.circuit.identity_roots = 4;
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_secret_len() {
        let mut config = AnchorConfig::default();
        config.notes.blinding_len = 32;
        assert!(config.validate().is_err());
    }
}
