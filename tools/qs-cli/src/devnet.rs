//! # Devnet
//!
//! A simulated ledger and local keys persisted to one JSON file between
//! invocations. Rounds follow the wall clock: opening the devnet produces the
//! blocks that would have closed since the last save, and a background
//! producer keeps closing blocks while a command runs.

use crate::error::CliError;
use chrono::{DateTime, Utc};
use qs_02_group_orchestrator::{
    Identity, InMemoryLedger, LedgerConfig, LedgerSnapshot, LocalKeystore, OrchestratorConfig,
    StakingService,
};
use serde::{Deserialize, Serialize};
use shared_types::{Address, Round};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Default round duration.
pub const DEFAULT_BLOCK_TIME_MS: u64 = 1_000;

/// Service acting on the devnet.
pub type DevnetService = StakingService<InMemoryLedger, InMemoryLedger, LocalKeystore>;

/// Persisted devnet state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DevnetFile {
    /// Wall-clock time of the genesis round.
    pub genesis_at: DateTime<Utc>,
    /// Milliseconds per round.
    pub block_time_ms: u64,
    /// Genesis round.
    pub genesis_round: Round,
    /// Hex-encoded key seeds by account name.
    pub accounts: BTreeMap<Identity, String>,
    /// Committed ledger state.
    pub ledger: LedgerSnapshot,
}

impl DevnetFile {
    /// Fresh devnet starting at `now`.
    pub fn new(block_time_ms: u64, now: DateTime<Utc>) -> Self {
        let genesis_round = LedgerConfig::default().genesis_round;
        Self {
            genesis_at: now,
            block_time_ms: block_time_ms.max(1),
            genesis_round,
            accounts: BTreeMap::new(),
            ledger: LedgerSnapshot::genesis(genesis_round),
        }
    }

    /// Round the wall clock says the ledger has reached at `now`.
    pub fn expected_round(&self, now: DateTime<Utc>) -> Round {
        let elapsed = (now - self.genesis_at).num_milliseconds().max(0) as u64;
        self.genesis_round + elapsed / self.block_time_ms.max(1)
    }

    /// Read the state file.
    pub fn read(path: &Path) -> Result<Self, CliError> {
        if !path.exists() {
            return Err(CliError::StateMissing(path.to_path_buf()));
        }
        let raw = fs::read_to_string(path).map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| CliError::StateFormat {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the state file through a temporary sibling.
    pub fn write(&self, path: &Path) -> Result<(), CliError> {
        let io_err = |source| CliError::Io {
            path: path.to_path_buf(),
            source,
        };
        let encoded = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, encoded).map_err(io_err)?;
        fs::rename(&tmp, path).map_err(io_err)
    }
}

/// Running devnet.
pub struct Devnet {
    path: PathBuf,
    file: DevnetFile,
    ledger: Arc<InMemoryLedger>,
    keystore: Arc<LocalKeystore>,
    producer: Option<JoinHandle<()>>,
}

impl Devnet {
    /// Create a fresh state file.
    pub fn init(path: &Path, block_time_ms: u64, force: bool) -> Result<DevnetFile, CliError> {
        if path.exists() && !force {
            return Err(CliError::StateExists(path.to_path_buf()));
        }
        let file = DevnetFile::new(block_time_ms, Utc::now());
        file.write(path)?;
        info!(path = %path.display(), block_time_ms, "[qs-cli] Devnet initialized");
        Ok(file)
    }

    /// Load the state file, catch up with the wall clock and start producing
    /// blocks. Must run inside a Tokio runtime.
    pub fn open(path: &Path) -> Result<Self, CliError> {
        let mut devnet = Self::load(path)?;
        let behind = devnet
            .file
            .expected_round(Utc::now())
            .saturating_sub(devnet.ledger.snapshot().round);
        if behind > 0 {
            let round = devnet.ledger.advance_rounds(behind);
            debug!(behind, round, "[qs-cli] Caught up with wall clock");
        }
        devnet.producer = Some(devnet.ledger.spawn_block_producer(devnet.block_time()));
        Ok(devnet)
    }

    /// Load without starting the producer or catching up.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let file = DevnetFile::read(path)?;
        let keystore = LocalKeystore::new();
        for (identity, seed_hex) in &file.accounts {
            keystore.insert_seed(identity.clone(), decode_seed(identity, seed_hex)?);
        }
        let config = LedgerConfig {
            genesis_round: file.genesis_round,
            ..LedgerConfig::default()
        };
        let ledger = InMemoryLedger::from_snapshot(config, file.ledger.clone());
        Ok(Self {
            path: path.to_path_buf(),
            file,
            ledger: Arc::new(ledger),
            keystore: Arc::new(keystore),
            producer: None,
        })
    }

    /// Round duration.
    pub fn block_time(&self) -> Duration {
        Duration::from_millis(self.file.block_time_ms)
    }

    /// Simulated ledger.
    pub fn ledger(&self) -> &Arc<InMemoryLedger> {
        &self.ledger
    }

    /// Local accounts with their addresses.
    pub fn accounts(&self) -> Vec<(Identity, Address)> {
        self.keystore.accounts()
    }

    /// Generate a key for `name`.
    pub fn add_account(&mut self, name: &str) -> Result<Address, CliError> {
        let identity = Identity::new(name);
        if self.file.accounts.contains_key(&identity) {
            return Err(CliError::AccountExists(name.to_string()));
        }
        let address = self.keystore.generate(identity.clone());
        let seed = self
            .keystore
            .seed_of(&identity)
            .ok_or_else(|| CliError::UnknownAccount(name.to_string()))?;
        self.file.accounts.insert(identity, hex::encode(seed));
        Ok(address)
    }

    /// Resolve an account name or a hex address.
    pub fn resolve(&self, who: &str) -> Result<Address, CliError> {
        if let Some((_, address)) = self
            .accounts()
            .into_iter()
            .find(|(identity, _)| identity.0 == who)
        {
            return Ok(address);
        }
        who.parse::<Address>()
            .map_err(|_| CliError::UnknownAccount(who.to_string()))
    }

    /// Service acting as account `name`.
    pub fn service(&self, name: &str, wait_for_unlock: bool) -> Result<DevnetService, CliError> {
        let identity = Identity::new(name);
        if !self.file.accounts.contains_key(&identity) {
            return Err(CliError::UnknownAccount(name.to_string()));
        }
        Ok(self.service_for(identity, wait_for_unlock))
    }

    /// Read-only service; it holds no key.
    pub fn observer(&self) -> DevnetService {
        self.service_for(Identity::new("observer"), false)
    }

    fn service_for(&self, identity: Identity, wait_for_unlock: bool) -> DevnetService {
        let config = OrchestratorConfig {
            poll_interval: (self.block_time() / 4).max(Duration::from_millis(10)),
            wait_for_unlock,
            ..OrchestratorConfig::default()
        };
        StakingService::new(
            config,
            identity,
            Arc::clone(&self.ledger),
            Arc::clone(&self.ledger),
            Arc::clone(&self.keystore),
        )
    }

    /// Stop producing blocks and persist the committed state.
    pub fn close(mut self) -> Result<(), CliError> {
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
        self.file.ledger = self.ledger.snapshot();
        self.file.write(&self.path)?;
        debug!(round = self.file.ledger.round, "[qs-cli] Devnet saved");
        Ok(())
    }
}

fn decode_seed(identity: &Identity, seed_hex: &str) -> Result<[u8; 32], CliError> {
    hex::decode(seed_hex)
        .ok()
        .and_then(|bytes| <[u8; 32]>::try_from(bytes.as_slice()).ok())
        .ok_or_else(|| CliError::InvalidSeed(identity.to_string()))
}
