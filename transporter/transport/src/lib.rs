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

//! Propagation of stake table roots to destination chains.
//!
//! A root is first confirmed on every supported chain with a BLS certified
//! transaction, after which each group's operator table can be pushed along
//! with its inclusion proof. Chains are processed one by one in registry
//! order and the first failure aborts the run; chains confirmed before it
//! keep their update.

use std::{sync::Arc, time::Duration};
use transporter_common::{
    B256, Certificate, CertificateTimestamp, Distribution, G2Point, GroupKey, MerkleTree,
    ZERO_ROOT, global_root_message_hash,
};
use transporter_ethereum::{
    ChainError, ChainManager, OperatorTableUpdater, Registry, Submission, SupportedChain,
    TxSubmitter, VerifierAbi,
};
use transporter_signer::{BlsSigner, TransactOpts, TransactionSigner};

mod error;

pub use error::{Stage, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConfig {
    /// Delay between two destination chains.
    pub chain_pacing: Duration,
    pub certificate_timestamp: CertificateTimestamp,
    /// Upper bound for waiting on a single receipt.
    pub receipt_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            chain_pacing: Duration::from_secs(2),
            certificate_timestamp: CertificateTimestamp::Caller,
            receipt_timeout: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChainConfirmation {
    pub chain_id: u64,
    pub submission: Submission,
}

/// Per chain outcome of a successful run.
#[derive(Debug, Clone, Default)]
pub struct ConfirmationReport {
    pub confirmed: Vec<ChainConfirmation>,
    pub skipped: Vec<u64>,
}

impl ConfirmationReport {
    pub fn confirmed_chains(&self) -> Vec<u64> {
        self.confirmed.iter().map(|c| c.chain_id).collect()
    }
}

type StageResult<T> = Result<T, (Stage, ChainError)>;

fn at<E: Into<ChainError>>(stage: Stage) -> impl FnOnce(E) -> (Stage, ChainError) {
    move |err| (stage, err.into())
}

pub struct Transport {
    registry: Arc<dyn Registry>,
    chains: ChainManager,
    bls_signer: Arc<dyn BlsSigner>,
    tx_signer: Arc<dyn TransactionSigner>,
    config: TransportConfig,
}

impl Transport {
    pub fn new(
        registry: Arc<dyn Registry>,
        chains: ChainManager,
        bls_signer: Arc<dyn BlsSigner>,
        tx_signer: Arc<dyn TransactionSigner>,
        config: TransportConfig,
    ) -> Self {
        Self {
            registry,
            chains,
            bls_signer,
            tx_signer,
            config,
        }
    }

    async fn supported_chains(&self) -> Result<Vec<SupportedChain>, TransportError> {
        let chains = self
            .registry
            .supported_chains()
            .await
            .map_err(TransportError::Registry)?;

        if chains.is_empty() {
            return Err(TransportError::NoSupportedChains);
        }

        Ok(chains)
    }

    /// Waits between chains unless nothing but skipped chains follows.
    async fn pace(&self, following: &[SupportedChain], skip_chains: &[u64]) {
        let pending = following
            .iter()
            .any(|chain| !skip_chains.contains(&chain.chain_id));
        if pending && !self.config.chain_pacing.is_zero() {
            tokio::time::sleep(self.config.chain_pacing).await;
        }
    }

    fn updater(&self, chain: &SupportedChain) -> StageResult<OperatorTableUpdater> {
        let client = self
            .chains
            .chain(chain.chain_id)
            .map_err(at(Stage::ResolveChain))?;

        Ok(OperatorTableUpdater::new(client, chain.verifier))
    }

    async fn submit(
        &self,
        updater: &OperatorTableUpdater,
        chain_id: u64,
        calldata: transporter_common::Bytes,
        stage: Stage,
    ) -> StageResult<Submission> {
        let opts = TransactOpts::new(self.tx_signer.clone(), chain_id);
        TxSubmitter::new(updater.client().as_ref(), self.config.receipt_timeout)
            .submit(&opts, updater.address(), calldata)
            .await
            .map_err(at(stage))
    }

    async fn confirm_on_chain(
        &self,
        chain: &SupportedChain,
        apk: G2Point,
        root: B256,
        reference_timestamp: u32,
        reference_block: u32,
    ) -> StageResult<Submission> {
        let updater = self.updater(chain)?;

        let (message_hash, abi) = match updater
            .message_hash(root, reference_timestamp, reference_block)
            .await
            .map_err(at(Stage::MessageHash))?
        {
            Some(hash) => (hash, VerifierAbi::Current),
            None => {
                tracing::debug!(
                    chain_id = chain.chain_id,
                    "verifier has no message hash query, hashing locally"
                );
                (
                    global_root_message_hash(root, reference_timestamp),
                    VerifierAbi::Legacy,
                )
            }
        };

        let signature = self
            .bls_signer
            .sign(&message_hash)
            .await
            .map_err(at(Stage::SignCertificate))?;

        let latest_timestamp = updater
            .latest_reference_timestamp()
            .await
            .map_err(at(Stage::ReferenceTimestamp))?;
        tracing::debug!(
            chain_id = chain.chain_id,
            latest_timestamp,
            reference_timestamp,
            "read latest reference timestamp"
        );

        let certificate = Certificate {
            message_hash,
            reference_timestamp: match self.config.certificate_timestamp {
                CertificateTimestamp::Caller => reference_timestamp,
                CertificateTimestamp::Destination => latest_timestamp,
            },
            signature,
            apk,
        };

        let calldata = OperatorTableUpdater::confirm_global_root_calldata(
            abi,
            certificate,
            root,
            reference_timestamp,
            reference_block,
        );
        self.submit(&updater, chain.chain_id, calldata, Stage::ConfirmGlobalRoot)
            .await
    }

    /// Confirms `root` on every supported chain not listed in `skip_chains`.
    ///
    /// A zero root is a no-op.
    pub async fn confirm_global_root(
        &self,
        root: B256,
        reference_timestamp: u32,
        reference_block: u64,
        skip_chains: &[u64],
    ) -> Result<ConfirmationReport, TransportError> {
        if root == ZERO_ROOT {
            tracing::info!(reference_block, "zero root, nothing to confirm");
            return Ok(ConfirmationReport::default());
        }

        let block = u32::try_from(reference_block)
            .map_err(|_| TransportError::BlockHeightOverflow(reference_block))?;

        tracing::info!(
            %root,
            reference_timestamp,
            reference_block,
            "confirming global table root"
        );

        let chains = self.supported_chains().await?;
        let apk = self
            .bls_signer
            .public_key()
            .await
            .map_err(TransportError::PublicKey)?;

        let mut report = ConfirmationReport::default();
        for (position, chain) in chains.iter().enumerate() {
            if skip_chains.contains(&chain.chain_id) {
                tracing::info!(chain_id = chain.chain_id, "skipping chain");
                report.skipped.push(chain.chain_id);
                continue;
            }

            let submission = self
                .confirm_on_chain(chain, apk, root, reference_timestamp, block)
                .await
                .map_err(|(stage, source)| TransportError::Chain {
                    chain_id: chain.chain_id,
                    stage,
                    confirmed: report.confirmed_chains(),
                    source,
                })?;

            tracing::info!(chain_id = chain.chain_id, %root, "global table root confirmed");
            report.confirmed.push(ChainConfirmation {
                chain_id: chain.chain_id,
                submission,
            });

            self.pace(&chains[position + 1..], skip_chains).await;
        }

        Ok(report)
    }

    /// Pushes the operator table of `group` with its inclusion proof in
    /// `tree` to every supported chain not listed in `skip_chains`.
    ///
    /// Destinations only accept the table once `root` is confirmed there for
    /// `reference_timestamp`.
    #[allow(clippy::too_many_arguments)]
    pub async fn transport_group_table(
        &self,
        reference_timestamp: u32,
        reference_block: u64,
        group: GroupKey,
        root: B256,
        tree: &MerkleTree,
        distribution: &Distribution,
        skip_chains: &[u64],
    ) -> Result<ConfirmationReport, TransportError> {
        if root == ZERO_ROOT {
            tracing::info!(%group, "zero root, nothing to transport");
            return Ok(ConfirmationReport::default());
        }

        let index = distribution
            .index(&group)
            .ok_or(TransportError::GroupNotFound(group))?;
        let table = distribution
            .payload(&group)
            .ok_or(TransportError::PayloadNotFound(group))?;
        let proof = tree.proof(index)?;
        let leaf_index = u32::try_from(index).map_err(|_| TransportError::IndexOverflow(index))?;

        tracing::info!(
            %group,
            index,
            proof_len = proof.hashes.len(),
            reference_block,
            "transporting group table"
        );

        let calldata = OperatorTableUpdater::update_operator_table_calldata(
            reference_timestamp,
            root,
            leaf_index,
            proof.flatten(),
            table.clone(),
        );

        let chains = self.supported_chains().await?;
        let mut report = ConfirmationReport::default();
        for (position, chain) in chains.iter().enumerate() {
            if skip_chains.contains(&chain.chain_id) {
                report.skipped.push(chain.chain_id);
                continue;
            }

            let result = match self.updater(chain) {
                Ok(updater) => {
                    self.submit(
                        &updater,
                        chain.chain_id,
                        calldata.clone(),
                        Stage::UpdateGroupTable,
                    )
                    .await
                }
                Err(err) => Err(err),
            };
            let submission = result.map_err(|(stage, source)| TransportError::Chain {
                chain_id: chain.chain_id,
                stage,
                confirmed: report.confirmed_chains(),
                source,
            })?;

            tracing::info!(chain_id = chain.chain_id, %group, "group table updated");
            report.confirmed.push(ChainConfirmation {
                chain_id: chain.chain_id,
                submission,
            });

            self.pace(&chains[position + 1..], skip_chains).await;
        }

        Ok(report)
    }

    /// Transports every group of `distribution` in index order.
    pub async fn transport_all_group_tables(
        &self,
        reference_timestamp: u32,
        reference_block: u64,
        root: B256,
        tree: &MerkleTree,
        distribution: &Distribution,
        skip_chains: &[u64],
    ) -> Result<Vec<(GroupKey, ConfirmationReport)>, TransportError> {
        let mut reports = Vec::with_capacity(distribution.len());
        for group in distribution.ordered_groups() {
            let report = self
                .transport_group_table(
                    reference_timestamp,
                    reference_block,
                    group,
                    root,
                    tree,
                    distribution,
                    skip_chains,
                )
                .await?;
            reports.push((group, report));
        }

        Ok(reports)
    }
}

#[cfg(test)]
mod tests;
