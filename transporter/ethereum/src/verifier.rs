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

//! Operator table updater deployed on every destination chain.

use crate::{
    ChainClient, ChainError, Result,
    abi::{BN254Certificate, IOperatorTableUpdater, IOperatorTableUpdaterLegacy},
};
use alloy::{
    primitives::{Address, B256, Bytes, TxKind},
    rpc::types::eth::{TransactionInput, TransactionRequest},
    sol_types::SolCall,
};
use std::sync::Arc;
use transporter_common::Certificate;

/// Generation of the verifier contract interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifierAbi {
    /// Computes the update message hash itself and takes the reference block.
    Current,
    /// Predates the message hash query, confirmation without a reference block.
    Legacy,
}

#[derive(Clone)]
pub struct OperatorTableUpdater {
    client: Arc<dyn ChainClient>,
    address: Address,
}

impl OperatorTableUpdater {
    pub fn new(client: Arc<dyn ChainClient>, address: Address) -> Self {
        Self { client, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn client(&self) -> &Arc<dyn ChainClient> {
        &self.client
    }

    async fn query<C: SolCall>(&self, call: C) -> Result<C::Return> {
        let request = TransactionRequest {
            to: Some(TxKind::Call(self.address)),
            input: TransactionInput::new(call.abi_encode().into()),
            ..Default::default()
        };

        let output = self.client.call(request, None).await?;
        C::abi_decode_returns(&output).map_err(|err| ChainError::decode(C::SIGNATURE, err))
    }

    /// Canonical update message hash as computed by the contract.
    ///
    /// `None` when the contract does not expose the query.
    pub async fn message_hash(
        &self,
        root: B256,
        reference_timestamp: u32,
        reference_block: u32,
    ) -> Result<Option<B256>> {
        let call = IOperatorTableUpdater::getGlobalTableUpdateMessageHashCall {
            globalTableRoot: root,
            referenceTimestamp: reference_timestamp,
            referenceBlockNumber: reference_block,
        };

        match self.query(call).await {
            Ok(hash) => Ok(Some(hash)),
            Err(ChainError::Reverted(data)) if data.is_empty() => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub async fn latest_reference_timestamp(&self) -> Result<u32> {
        self.query(IOperatorTableUpdater::getLatestReferenceTimestampCall {})
            .await
    }

    /// Confirmed global root for `reference_timestamp`, zero when none.
    pub async fn global_root_by_timestamp(&self, reference_timestamp: u32) -> Result<B256> {
        self.query(IOperatorTableUpdater::getGlobalTableRootByTimestampCall {
            referenceTimestamp: reference_timestamp,
        })
        .await
    }

    pub fn confirm_global_root_calldata(
        abi: VerifierAbi,
        certificate: Certificate,
        root: B256,
        reference_timestamp: u32,
        reference_block: u32,
    ) -> Bytes {
        let certificate = BN254Certificate::from(certificate);
        match abi {
            VerifierAbi::Current => IOperatorTableUpdater::confirmGlobalTableRootCall {
                globalTableRootCert: certificate,
                globalTableRoot: root,
                referenceTimestamp: reference_timestamp,
                referenceBlockNumber: reference_block,
            }
            .abi_encode(),
            VerifierAbi::Legacy => IOperatorTableUpdaterLegacy::confirmGlobalTableRootCall {
                globalTableRootCert: certificate,
                globalTableRoot: root,
                referenceTimestamp: reference_timestamp,
            }
            .abi_encode(),
        }
        .into()
    }

    pub fn update_operator_table_calldata(
        reference_timestamp: u32,
        root: B256,
        index: u32,
        proof: Bytes,
        table: Bytes,
    ) -> Bytes {
        IOperatorTableUpdater::updateOperatorTableCall {
            referenceTimestamp: reference_timestamp,
            globalTableRoot: root,
            operatorSetIndex: index,
            proof,
            operatorTableBytes: table,
        }
        .abi_encode()
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockChain;
    use transporter_common::{G1Point, G2Point};

    fn updater(chain: &MockChain) -> OperatorTableUpdater {
        OperatorTableUpdater::new(Arc::new(chain.clone()), MockChain::VERIFIER)
    }

    #[tokio::test]
    async fn message_hash_query_and_fallback() {
        let chain = MockChain::new(1);
        let root = B256::repeat_byte(3);

        let hash = updater(&chain).message_hash(root, 10, 20).await.unwrap();
        assert_eq!(hash, Some(MockChain::message_hash(root, 10, 20)));

        chain.set_message_hash_query(false).await;
        assert_eq!(updater(&chain).message_hash(root, 10, 20).await.unwrap(), None);
    }

    #[tokio::test]
    async fn reads_verifier_state() {
        let chain = MockChain::new(1);
        chain.set_latest_reference_timestamp(1234).await;

        let updater = updater(&chain);
        assert_eq!(updater.latest_reference_timestamp().await.unwrap(), 1234);
        assert_eq!(updater.global_root_by_timestamp(1234).await.unwrap(), B256::ZERO);
    }

    #[test]
    fn calldata_selectors() {
        let certificate = Certificate {
            message_hash: B256::repeat_byte(1),
            reference_timestamp: 5,
            signature: G1Point::default(),
            apk: G2Point::default(),
        };
        let root = B256::repeat_byte(2);

        let current = OperatorTableUpdater::confirm_global_root_calldata(
            VerifierAbi::Current,
            certificate,
            root,
            5,
            6,
        );
        let decoded =
            IOperatorTableUpdater::confirmGlobalTableRootCall::abi_decode(&current).unwrap();
        assert_eq!(decoded.referenceBlockNumber, 6);
        assert_eq!(Certificate::from(decoded.globalTableRootCert), certificate);

        let legacy = OperatorTableUpdater::confirm_global_root_calldata(
            VerifierAbi::Legacy,
            certificate,
            root,
            5,
            6,
        );
        assert_eq!(
            &legacy[..4],
            IOperatorTableUpdaterLegacy::confirmGlobalTableRootCall::SELECTOR.as_slice()
        );
        assert_ne!(&legacy[..4], &current[..4]);
    }
}
