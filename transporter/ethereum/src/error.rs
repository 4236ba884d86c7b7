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

use alloy::primitives::{B256, Bytes};
use std::time::Duration;
use transporter_signer::SignerError;

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("rpc request `{method}` failed: {reason}")]
    Rpc { method: &'static str, reason: String },
    #[error("call reverted with data {0}")]
    Reverted(Bytes),
    #[error("failed to decode `{method}` response: {reason}")]
    Decode { method: &'static str, reason: String },
    #[error("block {0} not found")]
    BlockNotFound(u64),
    #[error("latest block carries no base fee")]
    MissingBaseFee,
    #[error("transaction {tx_hash} was not mined within {timeout:?}")]
    ReceiptTimeout { tx_hash: B256, timeout: Duration },
    #[error("transaction {tx_hash} failed in block {block_number:?}")]
    TransactionFailed {
        tx_hash: B256,
        block_number: Option<u64>,
    },
    #[error("chain {0} is not configured")]
    ChainNotFound(u64),
    #[error("chain {0} is already configured")]
    DuplicateChain(u64),
    #[error("rpc endpoint reports chain {actual}, configured as {expected}")]
    ChainIdMismatch { expected: u64, actual: u64 },
    #[error("registry returned {chains} chain ids but {verifiers} verifier addresses")]
    MalformedChainList { chains: usize, verifiers: usize },
    #[error("chain id {0} does not fit into u64")]
    ChainIdOverflow(alloy::primitives::U256),
    #[error(transparent)]
    Signer(#[from] SignerError),
}

impl ChainError {
    pub(crate) fn rpc(method: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Rpc {
            method,
            reason: err.to_string(),
        }
    }

    pub(crate) fn decode(method: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            method,
            reason: err.to_string(),
        }
    }
}

pub type Result<T, E = ChainError> = std::result::Result<T, E>;
