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

//! JSON-RPC surface of a single chain.

use crate::{ChainError, Result};
use alloy::{
    eips::BlockNumberOrTag,
    primitives::{Address, B256, Bytes},
    providers::{PendingTransactionBuilder, PendingTransactionError, Provider, ProviderBuilder, RootProvider},
    rpc::types::eth::TransactionRequest,
    transports::{RpcError, TransportError},
};
use async_trait::async_trait;
use std::time::Duration;

/// Outcome of a mined transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    pub success: bool,
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn chain_id(&self) -> Result<u64>;

    async fn block_number(&self) -> Result<u64>;

    async fn block_timestamp(&self, block: u64) -> Result<u64>;

    /// Next nonce of `address`, pending transactions included.
    async fn transaction_count(&self, address: Address) -> Result<u64>;

    async fn max_priority_fee_per_gas(&self) -> Result<u128>;

    /// Base fee of the latest block.
    async fn latest_base_fee(&self) -> Result<u128>;

    async fn estimate_gas(&self, request: TransactionRequest) -> Result<u64>;

    /// Executes a read only call, at the latest block when `block` is `None`.
    async fn call(&self, request: TransactionRequest, block: Option<u64>) -> Result<Bytes>;

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256>;

    async fn wait_for_receipt(&self, tx_hash: B256, timeout: Duration) -> Result<TxReceipt>;
}

/// [`ChainClient`] over an alloy HTTP provider.
#[derive(Debug, Clone)]
pub struct AlloyChainClient {
    provider: RootProvider,
}

impl AlloyChainClient {
    pub async fn connect(rpc_url: &str) -> Result<Self> {
        let provider = ProviderBuilder::default()
            .connect(rpc_url)
            .await
            .map_err(|err| ChainError::rpc("connect", err))?;

        Ok(Self { provider })
    }

    pub fn new(provider: RootProvider) -> Self {
        Self { provider }
    }
}

fn map_call_error(method: &'static str, err: TransportError) -> ChainError {
    if let RpcError::ErrorResp(payload) = &err {
        if let Some(data) = payload.as_revert_data() {
            return ChainError::Reverted(data);
        }
        if payload.message.contains("revert") {
            return ChainError::Reverted(Bytes::new());
        }
    }

    ChainError::rpc(method, err)
}

#[async_trait]
impl ChainClient for AlloyChainClient {
    async fn chain_id(&self) -> Result<u64> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|err| ChainError::rpc("eth_chainId", err))
    }

    async fn block_number(&self) -> Result<u64> {
        self.provider
            .get_block_number()
            .await
            .map_err(|err| ChainError::rpc("eth_blockNumber", err))
    }

    async fn block_timestamp(&self, block: u64) -> Result<u64> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Number(block))
            .await
            .map_err(|err| ChainError::rpc("eth_getBlockByNumber", err))?
            .ok_or(ChainError::BlockNotFound(block))?;

        Ok(block.header.timestamp)
    }

    async fn transaction_count(&self, address: Address) -> Result<u64> {
        self.provider
            .get_transaction_count(address)
            .pending()
            .await
            .map_err(|err| ChainError::rpc("eth_getTransactionCount", err))
    }

    async fn max_priority_fee_per_gas(&self) -> Result<u128> {
        self.provider
            .get_max_priority_fee_per_gas()
            .await
            .map_err(|err| ChainError::rpc("eth_maxPriorityFeePerGas", err))
    }

    async fn latest_base_fee(&self) -> Result<u128> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Latest)
            .await
            .map_err(|err| ChainError::rpc("eth_getBlockByNumber", err))?
            .ok_or(ChainError::MissingBaseFee)?;

        block
            .header
            .base_fee_per_gas
            .map(u128::from)
            .ok_or(ChainError::MissingBaseFee)
    }

    async fn estimate_gas(&self, request: TransactionRequest) -> Result<u64> {
        self.provider
            .estimate_gas(request)
            .await
            .map_err(|err| map_call_error("eth_estimateGas", err))
    }

    async fn call(&self, request: TransactionRequest, block: Option<u64>) -> Result<Bytes> {
        let call = self.provider.call(request);
        let call = match block {
            Some(number) => call.block(number.into()),
            None => call,
        };

        call.await.map_err(|err| map_call_error("eth_call", err))
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256> {
        let pending = self
            .provider
            .send_raw_transaction(&raw)
            .await
            .map_err(|err| ChainError::rpc("eth_sendRawTransaction", err))?;

        Ok(*pending.tx_hash())
    }

    async fn wait_for_receipt(&self, tx_hash: B256, timeout: Duration) -> Result<TxReceipt> {
        let receipt = PendingTransactionBuilder::new(self.provider.clone(), tx_hash)
            .with_timeout(Some(timeout))
            .get_receipt()
            .await
            .map_err(|err| match err {
                PendingTransactionError::TxWatcher(_) => {
                    ChainError::ReceiptTimeout { tx_hash, timeout }
                }
                err => ChainError::rpc("eth_getTransactionReceipt", err),
            })?;

        Ok(TxReceipt {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
            success: receipt.status(),
        })
    }
}
