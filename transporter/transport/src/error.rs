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

use derive_more::Display;
use transporter_common::{GroupKey, MerkleError};
use transporter_ethereum::ChainError;
use transporter_signer::SignerError;

/// Step of the per chain flow that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Stage {
    #[display("chain lookup")]
    ResolveChain,
    #[display("message hash query")]
    MessageHash,
    #[display("certificate signing")]
    SignCertificate,
    #[display("reference timestamp query")]
    ReferenceTimestamp,
    #[display("global root confirmation")]
    ConfirmGlobalRoot,
    #[display("group table update")]
    UpdateGroupTable,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("reference block {0} does not fit into uint32")]
    BlockHeightOverflow(u64),
    #[error("failed to read supported chains from the registry")]
    Registry(#[source] ChainError),
    #[error("registry reports no supported chains")]
    NoSupportedChains,
    #[error("failed to load BLS public key")]
    PublicKey(#[source] SignerError),
    #[error("group {0} not found in distribution")]
    GroupNotFound(GroupKey),
    #[error("no operator table for group {0}")]
    PayloadNotFound(GroupKey),
    #[error("group index {0} does not fit into uint32")]
    IndexOverflow(u64),
    #[error("failed to build inclusion proof")]
    Proof(#[from] MerkleError),
    #[error("chain {chain_id}: {stage} failed, already confirmed on {confirmed:?}")]
    Chain {
        chain_id: u64,
        stage: Stage,
        /// Chains which accepted the update before the failure. Not rolled back.
        confirmed: Vec<u64>,
        #[source]
        source: ChainError,
    },
}

impl TransportError {
    /// Chains confirmed before the run aborted.
    pub fn confirmed(&self) -> &[u64] {
        match self {
            Self::Chain { confirmed, .. } => confirmed,
            _ => &[],
        }
    }
}
