//! Merkle tree over ordered transaction digests.
//!
//! Behavior:
//! - An empty list of leaves yields [`EMPTY_ROOT`].
//! - Every stored level except the root has an even length: odd levels are
//!   padded by duplicating their last node before pairing.
//! - A proof for a padding duplicate has the same sibling digests and the same
//!   reconstructed root as the proof for the node it duplicates. Only the side
//!   of the first sibling differs. Proofs identify a position, not a unique leaf.

use crate::error::{ChainError, Result};
use crate::hashing::{hash_pair, Sha256Hex, EMPTY_ROOT};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    /// `levels[0]` are the (padded) leaves, the last level holds the root.
    levels: Vec<Vec<Sha256Hex>>,
    leaf_count: usize,
}

/// One step from a node towards the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    pub sibling: Sha256Hex,
    pub sibling_is_left: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub leaf: Sha256Hex,
    pub index: usize,
    pub steps: Vec<ProofStep>,
}

impl MerkleTree {
    pub fn build(leaves: &[Sha256Hex]) -> Self {
        if leaves.is_empty() {
            return MerkleTree {
                levels: vec![vec![EMPTY_ROOT.to_string()]],
                leaf_count: 0,
            };
        }

        let mut levels = Vec::new();
        let mut current = leaves.to_vec();

        while current.len() > 1 {
            if current.len() % 2 == 1 {
                if let Some(last) = current.last().cloned() {
                    current.push(last);
                }
            }
            let next = current
                .chunks(2)
                .map(|pair| hash_pair(&pair[0], &pair[1]))
                .collect();
            levels.push(current);
            current = next;
        }
        levels.push(current);

        MerkleTree {
            levels,
            leaf_count: leaves.len(),
        }
    }

    pub fn root(&self) -> &str {
        self.levels
            .last()
            .and_then(|level| level.first())
            .map(String::as_str)
            .unwrap_or(EMPTY_ROOT)
    }

    /// Number of leaves supplied to [`MerkleTree::build`], padding excluded.
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    pub fn levels(&self) -> &[Vec<Sha256Hex>] {
        &self.levels
    }

    /// Proof for the leaf at `target_index`. The padding slot of an odd leaf
    /// level is addressable: its proof carries the same sibling digests and
    /// reconstructs the same root as the original leaf, but its first step
    /// records the sibling on the left instead of the right.
    pub fn get_proof(&self, target_index: usize) -> Result<MerkleProof> {
        if self.leaf_count == 0 {
            return Err(ChainError::EmptyProofTarget(
                "tree has no leaves".to_string(),
            ));
        }
        let leaves = &self.levels[0];
        let leaf = leaves.get(target_index).cloned().ok_or_else(|| {
            ChainError::EmptyProofTarget(format!(
                "leaf index {} out of range ({} leaves)",
                target_index, self.leaf_count
            ))
        })?;

        let mut steps = Vec::with_capacity(self.levels.len().saturating_sub(1));
        let mut index = target_index;
        for level in &self.levels[..self.levels.len() - 1] {
            let (sibling_index, sibling_is_left) = if index % 2 == 0 {
                (index + 1, false)
            } else {
                (index - 1, true)
            };
            steps.push(ProofStep {
                sibling: level[sibling_index].clone(),
                sibling_is_left,
            });
            index /= 2;
        }

        Ok(MerkleProof {
            leaf,
            index: target_index,
            steps,
        })
    }

    /// Proof for the first occurrence of `digest` among the leaves.
    pub fn proof_for(&self, digest: &str) -> Result<MerkleProof> {
        let position = self.levels[0][..self.leaf_count]
            .iter()
            .position(|leaf| leaf == digest)
            .ok_or_else(|| {
                ChainError::EmptyProofTarget(format!("digest {} is not a leaf", digest))
            })?;
        self.get_proof(position)
    }
}

impl MerkleProof {
    /// Replays the recorded left/right order and returns the reconstructed root.
    pub fn compute_root(&self) -> Sha256Hex {
        self.steps.iter().fold(self.leaf.clone(), |acc, step| {
            if step.sibling_is_left {
                hash_pair(&step.sibling, &acc)
            } else {
                hash_pair(&acc, &step.sibling)
            }
        })
    }

    pub fn verify(&self, root: &str) -> bool {
        self.compute_root() == root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::sha256_hex;
    use proptest::prelude::*;

    fn leaf(data: &str) -> Sha256Hex {
        sha256_hex(data.as_bytes())
    }

    #[test]
    fn empty_tree_has_sentinel_root() {
        let tree = MerkleTree::build(&[]);
        assert_eq!(tree.root(), EMPTY_ROOT);
        assert!(matches!(
            tree.get_proof(0),
            Err(ChainError::EmptyProofTarget(_))
        ));
    }

    #[test]
    fn single_leaf_is_its_own_root() {
        let a = leaf("a");
        let tree = MerkleTree::build(&[a.clone()]);
        assert_eq!(tree.root(), a);
        let proof = tree.get_proof(0).unwrap();
        assert!(proof.steps.is_empty());
        assert!(proof.verify(&a));
    }

    #[test]
    fn odd_level_duplicates_last_leaf() {
        let (a, b, c) = (leaf("a"), leaf("b"), leaf("c"));
        let tree = MerkleTree::build(&[a.clone(), b.clone(), c.clone()]);

        let expected = hash_pair(&hash_pair(&a, &b), &hash_pair(&c, &c));
        assert_eq!(tree.root(), expected);
        assert_eq!(tree.levels()[0].len(), 4);
        assert_eq!(tree.leaf_count(), 3);
    }

    #[test]
    fn every_level_but_root_is_even() {
        let leaves: Vec<_> = (0..7).map(|i| leaf(&i.to_string())).collect();
        let tree = MerkleTree::build(&leaves);
        let (root, rest) = tree.levels().split_last().unwrap();
        assert_eq!(root.len(), 1);
        assert!(rest.iter().all(|level| level.len() % 2 == 0));
    }

    #[test]
    fn proof_records_sibling_sides() {
        let leaves: Vec<_> = ["a", "b", "c", "d"].iter().map(|s| leaf(s)).collect();
        let tree = MerkleTree::build(&leaves);

        let proof = tree.get_proof(2).unwrap();
        assert_eq!(proof.steps.len(), 2);
        assert_eq!(proof.steps[0].sibling, leaves[3]);
        assert!(!proof.steps[0].sibling_is_left);
        assert_eq!(proof.steps[1].sibling, hash_pair(&leaves[0], &leaves[1]));
        assert!(proof.steps[1].sibling_is_left);
        assert!(proof.verify(tree.root()));
    }

    #[test]
    fn padding_leaf_proof_matches_original() {
        let leaves: Vec<_> = ["a", "b", "c"].iter().map(|s| leaf(s)).collect();
        let tree = MerkleTree::build(&leaves);

        let original = tree.get_proof(2).unwrap();
        let padding = tree.get_proof(3).unwrap();
        assert_eq!(original.leaf, padding.leaf);
        assert_eq!(original.compute_root(), padding.compute_root());
        assert_eq!(original.steps[0].sibling, padding.steps[0].sibling);
        assert!(!original.steps[0].sibling_is_left);
        assert!(padding.steps[0].sibling_is_left);
        assert_eq!(original.steps[1..], padding.steps[1..]);
    }

    #[test]
    fn proof_for_missing_digest_fails() {
        let tree = MerkleTree::build(&[leaf("a"), leaf("b")]);
        assert!(matches!(
            tree.proof_for(&leaf("zzz")),
            Err(ChainError::EmptyProofTarget(_))
        ));
        assert!(tree.proof_for(&leaf("b")).unwrap().verify(tree.root()));
    }

    #[test]
    fn tampered_proof_does_not_verify() {
        let leaves: Vec<_> = ["a", "b", "c", "d", "e"].iter().map(|s| leaf(s)).collect();
        let tree = MerkleTree::build(&leaves);
        let mut proof = tree.get_proof(1).unwrap();
        proof.steps[0].sibling_is_left = !proof.steps[0].sibling_is_left;
        assert!(!proof.verify(tree.root()));
    }

    proptest! {
        #[test]
        fn every_leaf_proof_reconstructs_root(words in prop::collection::vec("[a-z]{1,8}", 1..40)) {
            let leaves: Vec<_> = words.iter().map(|w| leaf(w)).collect();
            let tree = MerkleTree::build(&leaves);
            for (i, digest) in leaves.iter().enumerate() {
                let proof = tree.get_proof(i).unwrap();
                prop_assert_eq!(&proof.leaf, digest);
                prop_assert!(proof.verify(tree.root()));
            }
        }

        #[test]
        fn swapping_distinct_leaves_changes_root(words in prop::collection::hash_set("[a-z]{1,8}", 2..20)) {
            let leaves: Vec<_> = words.iter().map(|w| leaf(w)).collect();
            let mut swapped = leaves.clone();
            swapped.swap(0, 1);
            let original = MerkleTree::build(&leaves);
            let permuted = MerkleTree::build(&swapped);
            prop_assert_ne!(original.root(), permuted.root());
        }
    }
}
