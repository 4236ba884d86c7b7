// This file is part of Gear.
//
// Copyright (C) 2025 Gear Technologies Inc.
// SPDX-License-Identifier: GPL-3.0-or-later WITH Classpath-exception-2.0
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Keccak-256 binary merkle tree over stake table payloads.
//!
//! The layout matches what the operator table updater verifies on chain:
//! leaves are `keccak256(payload)`, the leaf layer is padded with zero hashes
//! up to the next power of two and every parent is `keccak256(left ++ right)`
//! without sorting the children.

use crate::ZERO_ROOT;
use alloy_primitives::{B256, Bytes, keccak256};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MerkleError {
    #[error("merkle tree has no leaves")]
    EmptyTree,
    #[error("leaf index {index} is out of range, tree has {leaves} leaves")]
    IndexOutOfRange { index: u64, leaves: usize },
    #[error("flattened proof length {0} is not a multiple of 32")]
    MalformedProof(usize),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MerkleTree {
    leaves: usize,
    // Heap layout: `nodes[1]` is the root, children of `i` are `2i` and `2i + 1`.
    nodes: Vec<B256>,
}

impl MerkleTree {
    pub fn new<T: AsRef<[u8]>>(leaves: &[T]) -> Self {
        if leaves.is_empty() {
            return Self::default();
        }

        let width = leaves.len().next_power_of_two();
        let mut nodes = vec![B256::ZERO; width * 2];
        for (i, leaf) in leaves.iter().enumerate() {
            nodes[width + i] = keccak256(leaf);
        }
        for i in (1..width).rev() {
            nodes[i] = hash_pair(&nodes[i * 2], &nodes[i * 2 + 1]);
        }

        Self {
            leaves: leaves.len(),
            nodes,
        }
    }

    /// Root of the tree, [`ZERO_ROOT`] for an empty one.
    pub fn root(&self) -> B256 {
        self.nodes.get(1).copied().unwrap_or(ZERO_ROOT)
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves
    }

    pub fn is_empty(&self) -> bool {
        self.leaves == 0
    }

    /// Inclusion proof for the leaf at `index`, siblings ordered leaf to root.
    pub fn proof(&self, index: u64) -> Result<MerkleProof, MerkleError> {
        if self.is_empty() {
            return Err(MerkleError::EmptyTree);
        }

        let position = usize::try_from(index)
            .ok()
            .filter(|i| *i < self.leaves)
            .ok_or(MerkleError::IndexOutOfRange {
                index,
                leaves: self.leaves,
            })?;

        let mut hashes = Vec::new();
        let mut node = position + self.nodes.len() / 2;
        while node > 1 {
            hashes.push(self.nodes[node ^ 1]);
            node /= 2;
        }

        Ok(MerkleProof { index, hashes })
    }
}

/// Sibling path from a leaf to the root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MerkleProof {
    pub index: u64,
    pub hashes: Vec<B256>,
}

impl MerkleProof {
    /// Concatenation of all sibling hashes, the form verifier contracts take.
    pub fn flatten(&self) -> Bytes {
        self.hashes
            .iter()
            .flat_map(|hash| hash.0)
            .collect::<Vec<u8>>()
            .into()
    }

    pub fn from_flattened(index: u64, flattened: &[u8]) -> Result<Self, MerkleError> {
        if flattened.len() % 32 != 0 {
            return Err(MerkleError::MalformedProof(flattened.len()));
        }

        let hashes = flattened.chunks_exact(32).map(B256::from_slice).collect();
        Ok(Self { index, hashes })
    }

    /// Recomputes the root for `leaf` the way the verifier contract does.
    pub fn compute_root(&self, leaf: impl AsRef<[u8]>) -> B256 {
        let mut index = self.index;
        let mut node = keccak256(leaf);
        for sibling in &self.hashes {
            node = if index % 2 == 0 {
                hash_pair(&node, sibling)
            } else {
                hash_pair(sibling, &node)
            };
            index /= 2;
        }
        node
    }

    pub fn verify(&self, root: B256, leaf: impl AsRef<[u8]>) -> bool {
        self.compute_root(leaf) == root
    }
}

fn hash_pair(left: &B256, right: &B256) -> B256 {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(left.as_slice());
    buf[32..].copy_from_slice(right.as_slice());
    keccak256(buf)
}
