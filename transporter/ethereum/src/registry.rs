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

//! Queries against the cross chain registry on the source chain.

use crate::{
    ChainClient, ChainError, Result,
    abi::{ICrossChainRegistry, OperatorSet},
};
use alloy::{
    primitives::{Address, Bytes, TxKind, U256},
    rpc::types::eth::{TransactionInput, TransactionRequest},
    sol_types::SolCall,
};
use async_trait::async_trait;
use std::sync::Arc;
use transporter_common::GroupKey;

/// Destination chain together with the verifier contract deployed on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupportedChain {
    pub chain_id: u64,
    pub verifier: Address,
}

#[async_trait]
pub trait Registry: Send + Sync {
    /// Number of groups active at `block`.
    async fn active_group_count(&self, block: u64) -> Result<u64>;

    /// Active groups with positions in `[start, end)`.
    async fn active_groups_by_range(&self, block: u64, start: u64, end: u64) -> Result<Vec<GroupKey>>;

    /// Serialized operator table of `group` at `block`.
    async fn calculate_table_bytes(&self, block: u64, group: GroupKey) -> Result<Bytes>;

    /// Destination chains, in registry order.
    async fn supported_chains(&self) -> Result<Vec<SupportedChain>>;
}

/// [`Registry`] backed by contract calls on the source chain.
#[derive(Clone)]
pub struct RegistryQuery {
    client: Arc<dyn ChainClient>,
    address: Address,
}

impl RegistryQuery {
    pub fn new(client: Arc<dyn ChainClient>, address: Address) -> Self {
        Self { client, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    async fn query<C: SolCall>(&self, call: C, block: Option<u64>) -> Result<C::Return> {
        let request = TransactionRequest {
            to: Some(TxKind::Call(self.address)),
            input: TransactionInput::new(call.abi_encode().into()),
            ..Default::default()
        };

        let output = self.client.call(request, block).await?;
        C::abi_decode_returns(&output).map_err(|err| ChainError::decode(C::SIGNATURE, err))
    }
}

#[async_trait]
impl Registry for RegistryQuery {
    async fn active_group_count(&self, block: u64) -> Result<u64> {
        let count = self
            .query(
                ICrossChainRegistry::getActiveGenerationReservationCountCall {},
                Some(block),
            )
            .await?;

        u64::try_from(count).map_err(|err| {
            ChainError::decode(
                ICrossChainRegistry::getActiveGenerationReservationCountCall::SIGNATURE,
                err,
            )
        })
    }

    async fn active_groups_by_range(&self, block: u64, start: u64, end: u64) -> Result<Vec<GroupKey>> {
        let sets = self
            .query(
                ICrossChainRegistry::getActiveGenerationReservationsByRangeCall {
                    startIndex: U256::from(start),
                    endIndex: U256::from(end),
                },
                Some(block),
            )
            .await?;

        Ok(sets.into_iter().map(GroupKey::from).collect())
    }

    async fn calculate_table_bytes(&self, block: u64, group: GroupKey) -> Result<Bytes> {
        self.query(
            ICrossChainRegistry::calculateOperatorTableBytesCall {
                operatorSet: OperatorSet::from(group),
            },
            Some(block),
        )
        .await
    }

    async fn supported_chains(&self) -> Result<Vec<SupportedChain>> {
        let ICrossChainRegistry::getSupportedChainsReturn {
            chainIds,
            operatorTableUpdaters,
        } = self
            .query(ICrossChainRegistry::getSupportedChainsCall {}, None)
            .await?;

        if chainIds.len() != operatorTableUpdaters.len() {
            return Err(ChainError::MalformedChainList {
                chains: chainIds.len(),
                verifiers: operatorTableUpdaters.len(),
            });
        }

        chainIds
            .into_iter()
            .zip(operatorTableUpdaters)
            .map(|(chain_id, verifier)| {
                let chain_id =
                    u64::try_from(chain_id).map_err(|_| ChainError::ChainIdOverflow(chain_id))?;
                Ok(SupportedChain { chain_id, verifier })
            })
            .collect()
    }
}
