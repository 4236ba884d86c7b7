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

//! In-memory chain and registry used by tests across the workspace.

use crate::{
    ChainClient, ChainError, Registry, Result, SupportedChain, TxReceipt,
    abi::{ICrossChainRegistry, IOperatorTableUpdater, IOperatorTableUpdaterLegacy, OperatorSet},
};
use alloy::{
    consensus::TxEnvelope,
    eips::Decodable2718,
    primitives::{Address, B256, Bytes, TxKind, U256, keccak256},
    rpc::types::eth::TransactionRequest,
    sol_types::{SolCall, SolValue},
};
use async_trait::async_trait;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::RwLock;
use transporter_common::{GroupKey, MerkleProof};

/// Registry contents shared by [`MockRegistry`] and registry calls on [`MockChain`].
#[derive(Debug, Clone, Default)]
pub struct MockRegistryState {
    pub groups: Vec<GroupKey>,
    pub chains: Vec<(u64, Address)>,
    /// Verifier addresses reported on top of `chains`, to produce malformed lists.
    pub extra_verifiers: usize,
    pub failing_groups: Vec<GroupKey>,
    /// Range calls starting at one of these offsets fail.
    pub failing_ranges: Vec<u64>,
    pub fail_count: bool,
    /// Count reported instead of `groups.len()`.
    pub reported_count: Option<u64>,
}

impl MockRegistryState {
    /// Table payload served for `group`.
    pub fn table_bytes(group: &GroupKey) -> Bytes {
        (group.owner, group.id).abi_encode().into()
    }

    fn count(&self) -> Result<u64> {
        if self.fail_count {
            return Err(ChainError::rpc("eth_call", "registry unavailable"));
        }
        Ok(self.reported_count.unwrap_or(self.groups.len() as u64))
    }

    fn range(&self, start: u64, end: u64) -> Result<Vec<GroupKey>> {
        if self.failing_ranges.contains(&start) {
            return Err(ChainError::rpc("eth_call", "range request failed"));
        }

        let len = self.groups.len();
        let start = (start as usize).min(len);
        let end = (end as usize).clamp(start, len);
        Ok(self.groups[start..end].to_vec())
    }

    fn table(&self, group: GroupKey) -> Result<Bytes> {
        if self.failing_groups.contains(&group) {
            return Err(ChainError::Reverted(Bytes::new()));
        }
        Ok(Self::table_bytes(&group))
    }

    fn chains(&self) -> (Vec<U256>, Vec<Address>) {
        let ids = self.chains.iter().map(|(id, _)| U256::from(*id)).collect();
        let mut verifiers: Vec<_> = self.chains.iter().map(|(_, verifier)| *verifier).collect();
        verifiers.extend((0..self.extra_verifiers).map(|i| Address::with_last_byte(i as u8)));
        (ids, verifiers)
    }
}

/// Calls observed by [`MockRegistry`].
#[derive(Debug, Clone, Default)]
pub struct RegistryCalls {
    pub count: usize,
    pub ranges: Vec<(u64, u64)>,
    pub tables: Vec<GroupKey>,
    pub supported_chains: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MockRegistry {
    pub state: Arc<RwLock<MockRegistryState>>,
    pub calls: Arc<RwLock<RegistryCalls>>,
}

impl MockRegistry {
    pub fn new(state: MockRegistryState) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
            calls: Default::default(),
        }
    }

    pub fn with_groups(groups: Vec<GroupKey>) -> Self {
        Self::new(MockRegistryState {
            groups,
            ..Default::default()
        })
    }

    pub async fn calls(&self) -> RegistryCalls {
        self.calls.read().await.clone()
    }
}

#[async_trait]
impl Registry for MockRegistry {
    async fn active_group_count(&self, _block: u64) -> Result<u64> {
        self.calls.write().await.count += 1;
        self.state.read().await.count()
    }

    async fn active_groups_by_range(&self, _block: u64, start: u64, end: u64) -> Result<Vec<GroupKey>> {
        self.calls.write().await.ranges.push((start, end));
        self.state.read().await.range(start, end)
    }

    async fn calculate_table_bytes(&self, _block: u64, group: GroupKey) -> Result<Bytes> {
        self.calls.write().await.tables.push(group);
        self.state.read().await.table(group)
    }

    async fn supported_chains(&self) -> Result<Vec<SupportedChain>> {
        self.calls.write().await.supported_chains += 1;
        let state = self.state.read().await;
        if state.extra_verifiers > 0 {
            let (ids, verifiers) = state.chains();
            return Err(ChainError::MalformedChainList {
                chains: ids.len(),
                verifiers: verifiers.len(),
            });
        }

        Ok(state
            .chains
            .iter()
            .map(|(chain_id, verifier)| SupportedChain {
                chain_id: *chain_id,
                verifier: *verifier,
            })
            .collect())
    }
}

/// Transaction accepted by [`MockChain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentTx {
    pub tx_hash: B256,
    pub from: Address,
    pub nonce: u64,
    pub to: Address,
    pub input: Bytes,
    pub gas_limit: u64,
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}

/// Group table accepted by the mock verifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedTable {
    pub reference_timestamp: u32,
    pub root: B256,
    pub index: u32,
    pub table: Bytes,
}

#[derive(Debug)]
struct ChainState {
    block_number: u64,
    base_fee: u128,
    tip: Option<u128>,
    gas_estimate: u64,
    fail_estimate: bool,
    failing_transactions: usize,
    unreachable: bool,
    message_hash_query: bool,
    latest_reference_timestamp: u32,
    roots: HashMap<u32, B256>,
    certificates: Vec<crate::abi::BN254Certificate>,
    tables: Vec<AcceptedTable>,
    nonces: HashMap<Address, u64>,
    sent: Vec<SentTx>,
    receipts: HashMap<B256, TxReceipt>,
    registry: Option<(Address, MockRegistryState)>,
}

impl Default for ChainState {
    fn default() -> Self {
        Self {
            block_number: 100,
            base_fee: 1_000_000_000,
            tip: Some(1_000_000_000),
            gas_estimate: 100_000,
            fail_estimate: false,
            failing_transactions: 0,
            unreachable: false,
            message_hash_query: true,
            latest_reference_timestamp: 0,
            roots: Default::default(),
            certificates: Default::default(),
            tables: Default::default(),
            nonces: Default::default(),
            sent: Default::default(),
            receipts: Default::default(),
            registry: None,
        }
    }
}

impl ChainState {
    /// Executes verifier calldata against the state, returns whether it succeeded.
    fn execute_verifier(&mut self, input: &[u8], apply: bool) -> bool {
        let confirmed = if let Ok(call) = IOperatorTableUpdater::confirmGlobalTableRootCall::abi_decode(input) {
            Some((call.globalTableRootCert, call.globalTableRoot, call.referenceTimestamp))
        } else if let Ok(call) = IOperatorTableUpdaterLegacy::confirmGlobalTableRootCall::abi_decode(input) {
            Some((call.globalTableRootCert, call.globalTableRoot, call.referenceTimestamp))
        } else {
            None
        };

        if let Some((certificate, root, timestamp)) = confirmed {
            if root.is_zero() {
                return false;
            }
            if apply {
                self.roots.insert(timestamp, root);
                self.latest_reference_timestamp = self.latest_reference_timestamp.max(timestamp);
                self.certificates.push(certificate);
            }
            return true;
        }

        if let Ok(call) = IOperatorTableUpdater::updateOperatorTableCall::abi_decode(input) {
            if self.roots.get(&call.referenceTimestamp) != Some(&call.globalTableRoot) {
                return false;
            }
            let valid = MerkleProof::from_flattened(call.operatorSetIndex.into(), &call.proof)
                .is_ok_and(|proof| proof.verify(call.globalTableRoot, &call.operatorTableBytes));
            if valid && apply {
                self.tables.push(AcceptedTable {
                    reference_timestamp: call.referenceTimestamp,
                    root: call.globalTableRoot,
                    index: call.operatorSetIndex,
                    table: call.operatorTableBytes,
                });
            }
            return valid;
        }

        false
    }

    fn execute(&mut self, to: Address, input: &[u8], apply: bool) -> bool {
        if to == MockChain::VERIFIER {
            self.execute_verifier(input, apply)
        } else {
            true
        }
    }

    fn registry_call(&self, input: &[u8]) -> Option<Result<Bytes>> {
        let (_, registry) = self.registry.as_ref()?;

        let output = if ICrossChainRegistry::getActiveGenerationReservationCountCall::abi_decode(input).is_ok() {
            registry.count().map(|count| {
                ICrossChainRegistry::getActiveGenerationReservationCountCall::abi_encode_returns(&U256::from(count))
            })
        } else if let Ok(call) =
            ICrossChainRegistry::getActiveGenerationReservationsByRangeCall::abi_decode(input)
        {
            registry
                .range(call.startIndex.to::<u64>(), call.endIndex.to::<u64>())
                .map(|groups| {
                    let sets: Vec<OperatorSet> = groups.into_iter().map(Into::into).collect();
                    ICrossChainRegistry::getActiveGenerationReservationsByRangeCall::abi_encode_returns(&sets)
                })
        } else if let Ok(call) = ICrossChainRegistry::calculateOperatorTableBytesCall::abi_decode(input) {
            registry.table(call.operatorSet.into()).map(|table| {
                ICrossChainRegistry::calculateOperatorTableBytesCall::abi_encode_returns(&table)
            })
        } else if ICrossChainRegistry::getSupportedChainsCall::abi_decode(input).is_ok() {
            let (chain_ids, verifiers) = registry.chains();
            Ok(ICrossChainRegistry::getSupportedChainsCall::abi_encode_returns(
                &ICrossChainRegistry::getSupportedChainsReturn {
                    chainIds: chain_ids,
                    operatorTableUpdaters: verifiers,
                },
            ))
        } else {
            Err(ChainError::Reverted(Bytes::new()))
        };

        Some(output.map(Into::into))
    }

    fn verifier_call(&self, input: &[u8]) -> Result<Bytes> {
        let output = if IOperatorTableUpdater::getLatestReferenceTimestampCall::abi_decode(input).is_ok() {
            IOperatorTableUpdater::getLatestReferenceTimestampCall::abi_encode_returns(
                &self.latest_reference_timestamp,
            )
        } else if let Ok(call) =
            IOperatorTableUpdater::getGlobalTableUpdateMessageHashCall::abi_decode(input)
        {
            if !self.message_hash_query {
                return Err(ChainError::Reverted(Bytes::new()));
            }
            IOperatorTableUpdater::getGlobalTableUpdateMessageHashCall::abi_encode_returns(
                &MockChain::message_hash(
                    call.globalTableRoot,
                    call.referenceTimestamp,
                    call.referenceBlockNumber,
                ),
            )
        } else if let Ok(call) =
            IOperatorTableUpdater::getGlobalTableRootByTimestampCall::abi_decode(input)
        {
            let root = self
                .roots
                .get(&call.referenceTimestamp)
                .copied()
                .unwrap_or_default();
            IOperatorTableUpdater::getGlobalTableRootByTimestampCall::abi_encode_returns(&root)
        } else {
            return Err(ChainError::Reverted(Bytes::new()));
        };

        Ok(output.into())
    }
}

/// Stateful in-memory chain with an operator table updater deployed at
/// [`MockChain::VERIFIER`].
#[derive(Debug, Clone)]
pub struct MockChain {
    chain_id: u64,
    state: Arc<RwLock<ChainState>>,
}

fn request_parts(request: &TransactionRequest) -> (Address, Bytes) {
    let to = match request.to {
        Some(TxKind::Call(to)) => to,
        _ => Address::ZERO,
    };
    let input = request.input.input().cloned().unwrap_or_default();
    (to, input)
}

impl MockChain {
    pub const VERIFIER: Address = Address::repeat_byte(0xee);

    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            state: Default::default(),
        }
    }

    /// Message hash the mock verifier reports, distinct from the local fallback.
    pub fn message_hash(root: B256, reference_timestamp: u32, reference_block: u32) -> B256 {
        keccak256((root, reference_timestamp, reference_block).abi_encode())
    }

    pub async fn set_registry(&self, address: Address, registry: MockRegistryState) {
        self.state.write().await.registry = Some((address, registry));
    }

    pub async fn set_base_fee(&self, base_fee: u128) {
        self.state.write().await.base_fee = base_fee;
    }

    pub async fn set_tip(&self, tip: Option<u128>) {
        self.state.write().await.tip = tip;
    }

    pub async fn set_gas_estimate(&self, gas: u64) {
        self.state.write().await.gas_estimate = gas;
    }

    pub async fn fail_estimate(&self, fail: bool) {
        self.state.write().await.fail_estimate = fail;
    }

    /// Makes the next `count` transactions mine with a failed status.
    pub async fn fail_next_transactions(&self, count: usize) {
        self.state.write().await.failing_transactions = count;
    }

    /// Makes every request fail as if the endpoint was down.
    pub async fn set_unreachable(&self, unreachable: bool) {
        self.state.write().await.unreachable = unreachable;
    }

    pub async fn set_message_hash_query(&self, supported: bool) {
        self.state.write().await.message_hash_query = supported;
    }

    pub async fn set_latest_reference_timestamp(&self, timestamp: u32) {
        self.state.write().await.latest_reference_timestamp = timestamp;
    }

    pub async fn set_block_number(&self, block_number: u64) {
        self.state.write().await.block_number = block_number;
    }

    pub async fn sent(&self) -> Vec<SentTx> {
        self.state.read().await.sent.clone()
    }

    /// Confirmed global root for `reference_timestamp`.
    pub async fn confirmed_root(&self, reference_timestamp: u32) -> Option<B256> {
        self.state
            .read()
            .await
            .roots
            .get(&reference_timestamp)
            .copied()
    }

    pub async fn certificates(&self) -> Vec<crate::abi::BN254Certificate> {
        self.state.read().await.certificates.clone()
    }

    pub async fn accepted_tables(&self) -> Vec<AcceptedTable> {
        self.state.read().await.tables.clone()
    }

    async fn reachable(&self, method: &'static str) -> Result<()> {
        if self.state.read().await.unreachable {
            return Err(ChainError::rpc(method, "connection refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn chain_id(&self) -> Result<u64> {
        self.reachable("eth_chainId").await?;
        Ok(self.chain_id)
    }

    async fn block_number(&self) -> Result<u64> {
        self.reachable("eth_blockNumber").await?;
        Ok(self.state.read().await.block_number)
    }

    async fn block_timestamp(&self, block: u64) -> Result<u64> {
        self.reachable("eth_getBlockByNumber").await?;
        if block > self.state.read().await.block_number {
            return Err(ChainError::BlockNotFound(block));
        }
        Ok(1_700_000_000 + block * 12)
    }

    async fn transaction_count(&self, address: Address) -> Result<u64> {
        self.reachable("eth_getTransactionCount").await?;
        Ok(self
            .state
            .read()
            .await
            .nonces
            .get(&address)
            .copied()
            .unwrap_or_default())
    }

    async fn max_priority_fee_per_gas(&self) -> Result<u128> {
        self.reachable("eth_maxPriorityFeePerGas").await?;
        self.state
            .read()
            .await
            .tip
            .ok_or_else(|| ChainError::rpc("eth_maxPriorityFeePerGas", "method not found"))
    }

    async fn latest_base_fee(&self) -> Result<u128> {
        self.reachable("eth_getBlockByNumber").await?;
        Ok(self.state.read().await.base_fee)
    }

    async fn estimate_gas(&self, request: TransactionRequest) -> Result<u64> {
        self.reachable("eth_estimateGas").await?;
        let mut state = self.state.write().await;
        let (to, input) = request_parts(&request);

        if state.fail_estimate || !state.execute(to, &input, false) {
            return Err(ChainError::Reverted(Bytes::new()));
        }
        Ok(state.gas_estimate)
    }

    async fn call(&self, request: TransactionRequest, _block: Option<u64>) -> Result<Bytes> {
        self.reachable("eth_call").await?;
        let state = self.state.read().await;
        let (to, input) = request_parts(&request);

        if let Some(output) = state
            .registry
            .as_ref()
            .filter(|(address, _)| *address == to)
            .and_then(|_| state.registry_call(&input))
        {
            return output;
        }

        if to == Self::VERIFIER {
            return state.verifier_call(&input);
        }

        Err(ChainError::Reverted(Bytes::new()))
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256> {
        self.reachable("eth_sendRawTransaction").await?;
        let envelope = TxEnvelope::decode_2718(&mut raw.as_ref())
            .map_err(|err| ChainError::rpc("eth_sendRawTransaction", err))?;
        let TxEnvelope::Eip1559(signed) = envelope else {
            return Err(ChainError::rpc(
                "eth_sendRawTransaction",
                "only EIP-1559 transactions are accepted",
            ));
        };

        let tx = signed.tx();
        if tx.chain_id != self.chain_id {
            return Err(ChainError::rpc("eth_sendRawTransaction", "invalid chain id"));
        }
        let from = signed
            .signature()
            .recover_address_from_prehash(&signed.signature_hash())
            .map_err(|err| ChainError::rpc("eth_sendRawTransaction", err))?;
        let TxKind::Call(to) = tx.to else {
            return Err(ChainError::rpc("eth_sendRawTransaction", "contract creation"));
        };

        let mut state = self.state.write().await;
        let expected_nonce = state.nonces.get(&from).copied().unwrap_or_default();
        if tx.nonce != expected_nonce {
            return Err(ChainError::rpc("eth_sendRawTransaction", "invalid nonce"));
        }
        state.nonces.insert(from, expected_nonce + 1);

        let tx_hash = *signed.hash();
        let success = if state.failing_transactions > 0 {
            state.failing_transactions -= 1;
            false
        } else {
            state.execute(to, &tx.input, true)
        };

        state.block_number += 1;
        let block_number = state.block_number;
        let gas_used = state.gas_estimate;
        state.receipts.insert(
            tx_hash,
            TxReceipt {
                tx_hash,
                block_number: Some(block_number),
                gas_used,
                success,
            },
        );
        state.sent.push(SentTx {
            tx_hash,
            from,
            nonce: tx.nonce,
            to,
            input: tx.input.clone(),
            gas_limit: tx.gas_limit,
            max_fee_per_gas: tx.max_fee_per_gas,
            max_priority_fee_per_gas: tx.max_priority_fee_per_gas,
        });

        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: B256, timeout: Duration) -> Result<TxReceipt> {
        self.reachable("eth_getTransactionReceipt").await?;
        self.state
            .read()
            .await
            .receipts
            .get(&tx_hash)
            .copied()
            .ok_or(ChainError::ReceiptTimeout { tx_hash, timeout })
    }
}
