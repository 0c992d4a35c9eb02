//! End-to-end ledger scenarios: mining, tampering, fork choice and proofs.

use tallychain::blockchain::{is_chain_valid, Ledger};
use tallychain::config::ChainConfig;
use tallychain::crypto::{KeyPair, Secp256k1Verifier};
use tallychain::error::ChainError;
use tallychain::transaction::Transaction;

fn config(difficulty: u32) -> ChainConfig {
    ChainConfig {
        difficulty,
        mining_reward: 1.0,
        max_mining_retries: 3,
    }
}

fn queue(ledger: &mut Ledger, count: u32, round: u32) {
    for i in 0..count {
        let amount = (round * 10 + i) as f64;
        ledger.add_transaction(Transaction::new("alice", "bob", amount).unwrap());
    }
}

#[test]
fn test_two_blocks_of_three_then_tamper() -> Result<(), Box<dyn std::error::Error>> {
    let mut ledger = Ledger::new(&config(2))?;

    queue(&mut ledger, 3, 1);
    ledger.mine_pending("miner")?;
    // The pool now starts with the first block's reward.
    assert_eq!(ledger.pending_len(), 1);
    queue(&mut ledger, 2, 2);
    ledger.mine_pending("miner")?;

    assert_eq!(ledger.len(), 3);
    assert!(ledger.is_valid());
    for block in &ledger.blocks()[1..] {
        assert_eq!(block.transactions().len(), 3);
        assert!(block.hash.starts_with("00"));
        assert_eq!(block.hash, block.compute_hash()?);
    }
    assert!(ledger.blocks()[2].transactions()[0].is_coinbase());

    let mut tampered = ledger.blocks().to_vec();
    tampered[1].previous_hash = "f".repeat(64);
    assert!(!is_chain_valid(&tampered, 2));
    assert!(matches!(
        Ledger::from_blocks(tampered, &config(2)),
        Err(ChainError::InvalidChainLinkage { index: 1, .. })
    ));
    Ok(())
}

#[test]
fn test_validity_holds_after_every_mine() -> Result<(), Box<dyn std::error::Error>> {
    let mut ledger = Ledger::new(&config(1))?;
    assert!(ledger.is_valid());
    for round in 0..4 {
        queue(&mut ledger, 3, round);
        ledger.mine_pending("miner")?;
        assert!(ledger.is_valid());
    }
    // Rewards for the first three blocks have been mined; the fourth is pending.
    assert_eq!(ledger.balance_of("miner"), 3.0);
    Ok(())
}

#[test]
fn test_every_block_transaction_has_a_proof() -> Result<(), Box<dyn std::error::Error>> {
    let mut ledger = Ledger::new(&config(1))?;
    queue(&mut ledger, 5, 0);
    let block = ledger.mine_pending("miner")?.clone();

    let tree = block.merkle_tree()?;
    assert_eq!(tree.root(), block.merkle_root());
    for tx in block.transactions() {
        let proof = tree.proof_for(&tx.digest()?)?;
        assert!(proof.verify(block.merkle_root()));
    }

    let stranger = Transaction::new("nobody", "nowhere", 9.0)?;
    assert!(matches!(
        tree.proof_for(&stranger.digest()?),
        Err(ChainError::EmptyProofTarget(_))
    ));
    Ok(())
}

#[test]
fn test_signed_transactions_survive_mining() -> Result<(), Box<dyn std::error::Error>> {
    let keypair = KeyPair::generate();
    let mut tx = Transaction::new(keypair.address(), "bob", 4.0)?;
    tx.sign(&keypair)?;

    let mut ledger = Ledger::new(&config(1))?;
    ledger.add_transaction(tx);
    let block = ledger.mine_pending("miner")?.clone();

    let stored = &block.transactions()[0];
    assert!(stored.verify(&Secp256k1Verifier, &keypair.public_key_bytes()));
    Ok(())
}

#[test]
fn test_ledger_catches_up_to_longest_fork() -> Result<(), Box<dyn std::error::Error>> {
    let mut local = Ledger::new(&config(1))?;
    local.mine_pending("local")?;

    let mut peer_a = Ledger::new(&config(1))?;
    let mut peer_b = Ledger::new(&config(1))?;
    for _ in 0..2 {
        peer_a.mine_pending("a")?;
    }
    for _ in 0..3 {
        peer_b.mine_pending("b")?;
    }

    let mut forged = peer_b.blocks().to_vec();
    forged[3].nonce += 1;

    assert!(!local.resolve_fork(vec![forged]));
    assert_eq!(local.len(), 2);

    assert!(local.resolve_fork(vec![peer_a.blocks().to_vec(), peer_b.blocks().to_vec()]));
    assert_eq!(local.blocks(), peer_b.blocks());
    Ok(())
}
