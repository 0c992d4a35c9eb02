//! Async host for a ledger: background mining, periodic peer sync, shutdown.

use crate::blockchain::{Ledger, SharedLedger};
use crate::config::Config;
use crate::error::{ChainError, Result};
use crate::miner::CancelToken;
use crate::persistence::ChainStore;
use crate::sync::{ChainSource, PeerSynchronizer};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Booting,
    Ready,
    Stopping,
    Stopped,
}

/// Installs a formatting subscriber. Safe to call more than once.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt().try_init();
}

pub struct Node {
    config: Config,
    ledger: SharedLedger,
    synchronizer: PeerSynchronizer,
    source: Arc<dyn ChainSource>,
    store: Arc<dyn ChainStore>,
    cancel: CancelToken,
    shutdown_tx: watch::Sender<bool>,
    state: RwLock<NodeState>,
}

impl Node {
    /// Restores the chain from `store` when one was saved, else starts from genesis.
    pub fn init(config: Config, source: Arc<dyn ChainSource>, store: Arc<dyn ChainStore>) -> Result<Self> {
        config.validate()?;

        let ledger = match store.load_chain()? {
            Some(blocks) => {
                info!(height = blocks.len(), "restoring chain from store");
                Ledger::from_blocks(blocks, &config.chain)?
            }
            None => {
                info!("no stored chain, starting from genesis");
                Ledger::new(&config.chain)?
            }
        };

        let (shutdown_tx, _) = watch::channel(false);
        Ok(Self {
            ledger: SharedLedger::new(ledger, config.chain.max_mining_retries),
            synchronizer: PeerSynchronizer::new(config.network.peers.clone()),
            config,
            source,
            store,
            cancel: CancelToken::new(),
            shutdown_tx,
            state: RwLock::new(NodeState::Booting),
        })
    }

    pub fn ledger(&self) -> &SharedLedger {
        &self.ledger
    }

    pub fn synchronizer(&self) -> &PeerSynchronizer {
        &self.synchronizer
    }

    pub fn state(&self) -> NodeState {
        *self.state.read()
    }

    /// Spawns the background loops. Mining only runs when enabled in config.
    pub fn start(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        let mut tasks = Vec::new();
        if self.config.miner.enabled {
            tasks.push(tokio::spawn(Arc::clone(self).mining_loop(self.shutdown_tx.subscribe())));
        }
        if !self.config.network.peers.is_empty() {
            tasks.push(tokio::spawn(Arc::clone(self).sync_loop(self.shutdown_tx.subscribe())));
        }
        *self.state.write() = NodeState::Ready;
        info!(
            mining = self.config.miner.enabled,
            peers = self.config.network.peers.len(),
            "node started"
        );
        tasks
    }

    /// Aborts any running proof-of-work search and stops the loops.
    pub fn shutdown(&self) {
        *self.state.write() = NodeState::Stopping;
        self.cancel.cancel();
        let _ = self.shutdown_tx.send(true);
    }

    /// Waits for the loops to finish and writes the final chain to the store.
    pub async fn join(&self, tasks: Vec<JoinHandle<()>>) -> Result<()> {
        for task in tasks {
            if let Err(e) = task.await {
                error!(error = %e, "node task failed");
            }
        }
        self.persist()?;
        *self.state.write() = NodeState::Stopped;
        info!(height = self.ledger.len(), "node stopped");
        Ok(())
    }

    fn persist(&self) -> Result<()> {
        self.store.save_chain(&self.ledger.blocks())
    }

    async fn mining_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let interval = Duration::from_millis(self.config.miner.interval_ms);
        loop {
            if *shutdown.borrow() {
                break;
            }

            let ledger = self.ledger.clone();
            let cancel = self.cancel.clone();
            let miner = self.config.miner.beneficiary_address.clone();
            let mined = tokio::task::spawn_blocking(move || ledger.mine_pending(&miner, &cancel)).await;

            match mined {
                Ok(Ok(block)) => {
                    info!(index = block.index, hash = %block.hash, "mined block");
                    if let Err(e) = self.persist() {
                        warn!(error = %e, "failed to persist chain");
                    }
                }
                Ok(Err(ChainError::MiningCancelled)) => break,
                Ok(Err(e)) => warn!(error = %e, "mining attempt failed"),
                Err(e) => {
                    error!(error = %e, "mining task panicked");
                    break;
                }
            }

            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    async fn sync_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let interval = Duration::from_millis(self.config.network.sync_interval_ms);
        loop {
            if *shutdown.borrow() {
                break;
            }

            let node = Arc::clone(&self);
            let outcome = tokio::task::spawn_blocking(move || {
                node.synchronizer.sync(&node.ledger, node.source.as_ref())
            })
            .await;

            match outcome {
                Ok(outcome) if outcome.replaced => {
                    if let Err(e) = self.persist() {
                        warn!(error = %e, "failed to persist chain");
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, "sync task panicked");
                    break;
                }
            }

            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }
}
