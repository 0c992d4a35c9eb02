//! Peer chain synchronization for TallyChain
//!
//! Transport is external: peers are reached through a [`ChainSource`], which
//! hands back a whole candidate chain or nothing. The synchronizer tracks how
//! reliable each peer has been and feeds the collected candidates to the
//! ledger's longest-valid-chain fork choice.

use crate::blockchain::{Block, SharedLedger};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, warn};

pub type PeerId = String;

/// Consecutive failures after which a peer is skipped.
pub const MAX_PEER_FAILURES: u32 = 3;

/// Retrieves a peer's full chain, or `None` when the peer is unreachable.
pub trait ChainSource: Send + Sync {
    fn fetch_chain(&self, peer: &str) -> Option<Vec<Block>>;
}

/// Chains served from memory. Used for local setups and tests.
#[derive(Debug, Default)]
pub struct InMemoryChainSource {
    chains: RwLock<HashMap<PeerId, Vec<Block>>>,
}

impl InMemoryChainSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, peer: impl Into<PeerId>, chain: Vec<Block>) {
        self.chains.write().insert(peer.into(), chain);
    }

    pub fn remove(&self, peer: &str) {
        self.chains.write().remove(peer);
    }
}

impl ChainSource for InMemoryChainSource {
    fn fetch_chain(&self, peer: &str) -> Option<Vec<Block>> {
        self.chains.read().get(peer).cloned()
    }
}

#[derive(Debug, Clone)]
pub struct PeerSyncInfo {
    pub peer: PeerId,
    pub last_height: Option<u64>,
    pub last_seen: Option<Instant>,
    pub sync_failures: u32,
}

impl PeerSyncInfo {
    pub fn new(peer: PeerId) -> Self {
        Self {
            peer,
            last_height: None,
            last_seen: None,
            sync_failures: 0,
        }
    }

    pub fn is_unreliable(&self) -> bool {
        self.sync_failures >= MAX_PEER_FAILURES
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub replaced: bool,
    pub candidates: usize,
    pub unreachable: Vec<PeerId>,
    pub skipped: Vec<PeerId>,
}

pub struct PeerSynchronizer {
    peers: RwLock<HashMap<PeerId, PeerSyncInfo>>,
}

impl PeerSynchronizer {
    pub fn new<I, S>(peers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<PeerId>,
    {
        let peers = peers
            .into_iter()
            .map(|peer| {
                let id: PeerId = peer.into();
                (id.clone(), PeerSyncInfo::new(id))
            })
            .collect();
        Self {
            peers: RwLock::new(peers),
        }
    }

    /// Returns false if the peer was already known.
    pub fn register_peer(&self, peer: impl Into<PeerId>) -> bool {
        let peer = peer.into();
        let mut peers = self.peers.write();
        if peers.contains_key(&peer) {
            return false;
        }
        peers.insert(peer.clone(), PeerSyncInfo::new(peer));
        true
    }

    pub fn remove_peer(&self, peer: &str) -> bool {
        self.peers.write().remove(peer).is_some()
    }

    pub fn peer_count(&self) -> usize {
        self.peers.read().len()
    }

    pub fn peer_info(&self, peer: &str) -> Option<PeerSyncInfo> {
        self.peers.read().get(peer).cloned()
    }

    /// Clears the failure count so an unreliable peer is polled again.
    pub fn reset_peer(&self, peer: &str) {
        if let Some(info) = self.peers.write().get_mut(peer) {
            info.sync_failures = 0;
        }
    }

    /// Fetches every reliable peer's chain and runs fork choice over them,
    /// in peer-id order so ties resolve the same way on every run.
    pub fn sync(&self, ledger: &SharedLedger, source: &dyn ChainSource) -> SyncOutcome {
        let mut ids: Vec<PeerId> = self.peers.read().keys().cloned().collect();
        ids.sort();

        let mut candidates = Vec::new();
        let mut unreachable = Vec::new();
        let mut skipped = Vec::new();

        for id in ids {
            if self.peer_info(&id).is_some_and(|info| info.is_unreliable()) {
                skipped.push(id);
                continue;
            }
            match source.fetch_chain(&id) {
                Some(chain) => {
                    self.record_success(&id, chain.len() as u64);
                    candidates.push(chain);
                }
                None => {
                    self.record_failure(&id);
                    unreachable.push(id);
                }
            }
        }

        let count = candidates.len();
        let replaced = ledger.resolve_fork(candidates);
        if replaced {
            info!(height = ledger.len(), "adopted longer chain from peers");
        } else {
            debug!(candidates = count, "local chain kept");
        }

        SyncOutcome {
            replaced,
            candidates: count,
            unreachable,
            skipped,
        }
    }

    fn record_success(&self, peer: &str, height: u64) {
        if let Some(info) = self.peers.write().get_mut(peer) {
            info.last_height = Some(height);
            info.last_seen = Some(Instant::now());
            info.sync_failures = 0;
        }
    }

    fn record_failure(&self, peer: &str) {
        if let Some(info) = self.peers.write().get_mut(peer) {
            info.sync_failures += 1;
            if info.is_unreliable() {
                warn!(peer, failures = info.sync_failures, "peer marked unreliable");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::Ledger;
    use crate::config::ChainConfig;

    fn config() -> ChainConfig {
        ChainConfig {
            difficulty: 1,
            mining_reward: 1.0,
            max_mining_retries: 3,
        }
    }

    fn chain_of(blocks_after_genesis: usize) -> Vec<Block> {
        let mut ledger = Ledger::new(&config()).unwrap();
        for _ in 0..blocks_after_genesis {
            ledger.mine_pending("peer-miner").unwrap();
        }
        ledger.blocks().to_vec()
    }

    #[test]
    fn test_register_peer() {
        let sync = PeerSynchronizer::new(Vec::<String>::new());
        assert!(sync.register_peer("p1"));
        assert!(!sync.register_peer("p1"));
        assert_eq!(sync.peer_count(), 1);
        assert!(sync.remove_peer("p1"));
        assert_eq!(sync.peer_count(), 0);
    }

    #[test]
    fn test_sync_adopts_longest_peer_chain() {
        let source = InMemoryChainSource::new();
        source.publish("short", chain_of(1));
        source.publish("long", chain_of(3));

        let ledger = SharedLedger::new(Ledger::new(&config()).unwrap(), 3);
        let sync = PeerSynchronizer::new(["short", "long", "offline"]);

        let outcome = sync.sync(&ledger, &source);
        assert!(outcome.replaced);
        assert_eq!(outcome.candidates, 2);
        assert_eq!(outcome.unreachable, vec!["offline".to_string()]);
        assert_eq!(ledger.len(), 4);
        assert_eq!(sync.peer_info("long").unwrap().last_height, Some(4));
    }

    #[test]
    fn test_unreachable_peer_becomes_unreliable() {
        let source = InMemoryChainSource::new();
        let ledger = SharedLedger::new(Ledger::new(&config()).unwrap(), 3);
        let sync = PeerSynchronizer::new(["ghost"]);

        for _ in 0..MAX_PEER_FAILURES {
            let outcome = sync.sync(&ledger, &source);
            assert_eq!(outcome.unreachable.len(), 1);
        }
        assert!(sync.peer_info("ghost").unwrap().is_unreliable());

        let outcome = sync.sync(&ledger, &source);
        assert_eq!(outcome.skipped, vec!["ghost".to_string()]);

        sync.reset_peer("ghost");
        assert!(!sync.peer_info("ghost").unwrap().is_unreliable());
    }

    #[test]
    fn test_invalid_peer_chain_is_ignored() {
        let source = InMemoryChainSource::new();
        let mut forged = chain_of(3);
        forged[2].previous_hash = "forged".to_string();
        source.publish("liar", forged);

        let ledger = SharedLedger::new(Ledger::new(&config()).unwrap(), 3);
        let outcome = PeerSynchronizer::new(["liar"]).sync(&ledger, &source);
        assert!(!outcome.replaced);
        assert_eq!(ledger.len(), 1);
    }
}
