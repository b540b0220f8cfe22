//! Merkle aggregation for block hashes
//!
//! A sealed block's hash is the Merkle root over the ledger seed followed by
//! the canonical form of each transaction, oldest first.
//!
//! # Design
//!
//! - Every leaf string is hashed on its own to form the bottom row
//! - Each parent is `H(left_hex || right_hex)` over the hex digests
//! - An odd row pairs its last digest with itself
//! - Reduction stops at a single digest, the root
//!
//! Inclusion proofs walk the same rows, so a proof for any leaf re-derives
//! exactly the root stored in the block.

use crate::crypto::HashAlgorithm;
use crate::types::Transaction;
use crate::{Error, Result};

/// Hash a pair of hex digests (used for internal nodes)
fn hash_pair(algorithm: HashAlgorithm, left: &str, right: &str) -> String {
    let mut joined = String::with_capacity(left.len() + right.len());
    joined.push_str(left);
    joined.push_str(right);
    algorithm.digest_hex(&joined)
}

/// Build the leaf sequence for a block: seed first, then each transaction
pub fn block_leaves<'a, I>(seed: &str, transactions: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    std::iter::once(seed.to_string())
        .chain(transactions.into_iter().map(Transaction::canonical_string))
        .collect()
}

/// Compute the Merkle root of an ordered leaf sequence
pub fn merkle_root(algorithm: HashAlgorithm, leaves: &[String]) -> Result<String> {
    MerkleTree::from_leaves(algorithm, leaves)?.root()
}

/// Direction of sibling in Merkle tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Sibling is on the left
    Left,
    /// Sibling is on the right
    Right,
}

/// Merkle proof (path from leaf to root)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleProof {
    /// Leaf digest being proven
    pub leaf_hash: String,
    /// Sibling digests along the path to root
    pub siblings: Vec<(Direction, String)>,
    /// Root digest
    pub root_hash: String,
}

impl MerkleProof {
    /// Verify the path re-derives the root
    pub fn verify(&self, algorithm: HashAlgorithm) -> bool {
        let mut current = self.leaf_hash.clone();

        for (direction, sibling) in &self.siblings {
            current = match direction {
                Direction::Left => hash_pair(algorithm, sibling, &current),
                Direction::Right => hash_pair(algorithm, &current, sibling),
            };
        }

        current == self.root_hash
    }

    /// Verify that this proof covers the given raw leaf string
    pub fn verify_leaf(&self, algorithm: HashAlgorithm, leaf: &str) -> bool {
        algorithm.digest_hex(leaf) == self.leaf_hash && self.verify(algorithm)
    }
}

/// Fully materialized Merkle tree
#[derive(Debug, Clone)]
pub struct MerkleTree {
    /// Rows from leaf digests (index 0) up to the root row
    levels: Vec<Vec<String>>,
}

impl MerkleTree {
    /// Build the tree from raw leaf strings
    ///
    /// An empty leaf sequence has no root and is rejected rather than
    /// mapped to a placeholder digest.
    pub fn from_leaves(algorithm: HashAlgorithm, leaves: &[String]) -> Result<Self> {
        if leaves.is_empty() {
            return Err(Error::Merkle("cannot aggregate an empty leaf sequence".to_string()));
        }

        let mut current_level: Vec<String> =
            leaves.iter().map(|leaf| algorithm.digest_hex(leaf)).collect();
        let mut levels = Vec::new();

        while current_level.len() > 1 {
            let next_level = current_level
                .chunks(2)
                .map(|pair| {
                    let left = &pair[0];
                    // Odd tail is paired with itself
                    let right = pair.get(1).unwrap_or(left);
                    hash_pair(algorithm, left, right)
                })
                .collect();

            levels.push(current_level);
            current_level = next_level;
        }
        levels.push(current_level);

        Ok(Self { levels })
    }

    /// Number of leaves
    pub fn len(&self) -> usize {
        self.levels[0].len()
    }

    /// Always false; a tree holds at least one leaf
    pub fn is_empty(&self) -> bool {
        self.levels[0].is_empty()
    }

    /// Root digest
    pub fn root(&self) -> Result<String> {
        self.levels
            .last()
            .and_then(|row| row.first())
            .cloned()
            .ok_or_else(|| Error::Merkle("tree has no root".to_string()))
    }

    /// Generate Merkle proof for the leaf at `leaf_index`
    pub fn generate_proof(&self, leaf_index: usize) -> Option<MerkleProof> {
        let leaf_hash = self.levels[0].get(leaf_index)?.clone();
        let root_hash = self.root().ok()?;
        let mut siblings = Vec::new();
        let mut index = leaf_index;

        // Every level except the root row contributes one sibling
        for level in &self.levels[..self.levels.len() - 1] {
            let (direction, sibling_index) = if index % 2 == 0 {
                // No right neighbour on an odd row: paired with itself
                (Direction::Right, (index + 1).min(level.len() - 1))
            } else {
                (Direction::Left, index - 1)
            };
            siblings.push((direction, level[sibling_index].clone()));
            index /= 2;
        }

        Some(MerkleProof {
            leaf_hash,
            siblings,
            root_hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALG: HashAlgorithm = HashAlgorithm::Sha256;

    fn leaves(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn h(s: &str) -> String {
        ALG.digest_hex(s)
    }

    #[test]
    fn test_empty_tree_is_error() {
        assert!(matches!(merkle_root(ALG, &[]), Err(Error::Merkle(_))));
    }

    #[test]
    fn test_single_leaf() {
        let root = merkle_root(ALG, &leaves(&["seed"])).unwrap();
        assert_eq!(root, h("seed"));
    }

    #[test]
    fn test_two_leaves() {
        let root = merkle_root(ALG, &leaves(&["a", "b"])).unwrap();
        assert_eq!(root, hash_pair(ALG, &h("a"), &h("b")));
    }

    #[test]
    fn test_odd_number_leaves() {
        let root = merkle_root(ALG, &leaves(&["a", "b", "c"])).unwrap();

        let ab = hash_pair(ALG, &h("a"), &h("b"));
        let cc = hash_pair(ALG, &h("c"), &h("c"));
        assert_eq!(root, hash_pair(ALG, &ab, &cc));
    }

    #[test]
    fn test_eleven_leaves_shape() {
        // seed + 10 transactions: rows of 11 -> 6 -> 3 -> 2 -> 1
        let items: Vec<String> = (0..11).map(|i| format!("leaf{}", i)).collect();
        let tree = MerkleTree::from_leaves(ALG, &items).unwrap();
        assert_eq!(tree.len(), 11);
        assert_eq!(tree.levels.len(), 5);
        assert_eq!(tree.levels[1].len(), 6);
        assert_eq!(tree.levels[2].len(), 3);
    }

    #[test]
    fn test_order_matters() {
        let a = merkle_root(ALG, &leaves(&["a", "b"])).unwrap();
        let b = merkle_root(ALG, &leaves(&["b", "a"])).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_proofs_verify_for_every_leaf() {
        let items: Vec<String> = (0..11).map(|i| format!("leaf{}", i)).collect();
        let tree = MerkleTree::from_leaves(ALG, &items).unwrap();
        let root = tree.root().unwrap();

        for (i, item) in items.iter().enumerate() {
            let proof = tree.generate_proof(i).unwrap();
            assert_eq!(proof.root_hash, root);
            assert!(proof.verify_leaf(ALG, item), "proof {} failed", i);
        }

        assert!(tree.generate_proof(items.len()).is_none());
    }

    #[test]
    fn test_proof_verification_invalid() {
        let tree = MerkleTree::from_leaves(ALG, &leaves(&["a", "b", "c"])).unwrap();
        let mut proof = tree.generate_proof(0).unwrap();

        assert!(!proof.verify_leaf(ALG, "b"));

        proof.root_hash = h("fake_root");
        assert!(!proof.verify(ALG));
    }

    #[test]
    fn test_block_leaves_starts_with_seed() {
        let out = block_leaves("chapman", std::iter::empty::<&Transaction>());
        assert_eq!(out, vec!["chapman".to_string()]);
    }
}
