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

//! Building, pricing, signing and confirming EIP-1559 transactions.

use crate::{ChainClient, ChainError, Result, TxReceipt};
use alloy::{
    consensus::{Signed, TxEip1559, TxEnvelope},
    eips::Encodable2718,
    primitives::{Address, Bytes, TxKind, U256},
    rpc::types::eth::{TransactionInput, TransactionRequest},
};
use std::time::Duration;
use transporter_signer::TransactOpts;

/// Tip used when the node cannot suggest one (1 gwei).
pub const FALLBACK_TIP_CAP: u128 = 1_000_000_000;

/// Extra gas on top of the estimate, in percent.
pub const GAS_LIMIT_MARGIN_PERCENT: u64 = 20;

/// Fee cap as `base_fee * 3 / 2 + tip`.
pub fn fee_cap(base_fee: u128, tip_cap: u128) -> u128 {
    base_fee.saturating_mul(3) / 2 + tip_cap
}

pub fn gas_limit_with_margin(estimate: u64) -> u64 {
    estimate.saturating_mul(100 + GAS_LIMIT_MARGIN_PERCENT) / 100
}

/// Result of a submission.
#[derive(Debug, Clone)]
pub enum Submission {
    /// Broadcast and mined successfully.
    Mined(TxReceipt),
    /// Built and signed only, the options were marked no-send.
    Signed(Signed<TxEip1559>),
}

impl Submission {
    pub fn receipt(&self) -> Option<&TxReceipt> {
        match self {
            Self::Mined(receipt) => Some(receipt),
            Self::Signed(_) => None,
        }
    }
}

pub struct TxSubmitter<'a> {
    client: &'a dyn ChainClient,
    receipt_timeout: Duration,
}

impl<'a> TxSubmitter<'a> {
    pub fn new(client: &'a dyn ChainClient, receipt_timeout: Duration) -> Self {
        Self {
            client,
            receipt_timeout,
        }
    }

    /// Unpriced transaction with nonce and calldata fixed.
    pub async fn draft(&self, opts: &TransactOpts, to: Address, input: Bytes) -> Result<TxEip1559> {
        let nonce = self.client.transaction_count(opts.from()).await?;

        Ok(TxEip1559 {
            chain_id: opts.chain_id(),
            nonce,
            to: TxKind::Call(to),
            value: U256::ZERO,
            input,
            ..Default::default()
        })
    }

    /// Fills tip, fee cap and gas limit of a drafted transaction.
    pub async fn price(&self, from: Address, mut tx: TxEip1559) -> Result<TxEip1559> {
        let tip_cap = match self.client.max_priority_fee_per_gas().await {
            Ok(tip) => tip,
            Err(err) => {
                tracing::warn!(
                    chain_id = tx.chain_id,
                    error = %err,
                    fallback = FALLBACK_TIP_CAP,
                    "failed to get suggested tip, using fallback"
                );
                FALLBACK_TIP_CAP
            }
        };
        let base_fee = self.client.latest_base_fee().await?;

        let request = TransactionRequest {
            from: Some(from),
            to: Some(tx.to),
            input: TransactionInput::new(tx.input.clone()),
            nonce: Some(tx.nonce),
            value: Some(tx.value),
            chain_id: Some(tx.chain_id),
            ..Default::default()
        };
        let estimate = self.client.estimate_gas(request).await?;

        tx.max_priority_fee_per_gas = tip_cap;
        tx.max_fee_per_gas = fee_cap(base_fee, tip_cap);
        tx.gas_limit = gas_limit_with_margin(estimate);

        tracing::debug!(
            chain_id = tx.chain_id,
            nonce = tx.nonce,
            tip_cap,
            fee_cap = tx.max_fee_per_gas,
            gas_limit = tx.gas_limit,
            "priced transaction"
        );

        Ok(tx)
    }

    /// Drafts, prices and signs a call to `to`, then broadcasts it and waits
    /// for a successful receipt unless `opts` is no-send.
    ///
    /// Failed transactions are reported, never retried.
    pub async fn submit(&self, opts: &TransactOpts, to: Address, input: Bytes) -> Result<Submission> {
        let draft = self.draft(&opts.clone().no_send(), to, input).await?;
        let tx = self.price(opts.from(), draft).await?;
        let signed = opts.sign(tx).await?;

        if opts.is_no_send() {
            return Ok(Submission::Signed(signed));
        }

        let raw = TxEnvelope::Eip1559(signed).encoded_2718();
        let tx_hash = self.client.send_raw_transaction(raw.into()).await?;
        tracing::info!(chain_id = opts.chain_id(), %tx_hash, "transaction sent");

        let receipt = tokio::time::timeout(
            self.receipt_timeout,
            self.client.wait_for_receipt(tx_hash, self.receipt_timeout),
        )
        .await
        .map_err(|_| ChainError::ReceiptTimeout {
            tx_hash,
            timeout: self.receipt_timeout,
        })??;

        if !receipt.success {
            return Err(ChainError::TransactionFailed {
                tx_hash,
                block_number: receipt.block_number,
            });
        }

        tracing::info!(
            chain_id = opts.chain_id(),
            %tx_hash,
            block_number = ?receipt.block_number,
            gas_used = receipt.gas_used,
            "transaction mined"
        );

        Ok(Submission::Mined(receipt))
    }
}
