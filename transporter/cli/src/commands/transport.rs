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

use super::{CalculationArgs, Network};
use crate::params::Params;
use anyhow::{Context, Result};
use clap::Parser;
use std::time::Duration;
use transporter_common::CertificateTimestamp;
use transporter_transport::{Transport, TransportConfig};

/// Confirm the stake table root and push group tables to destination chains.
#[derive(Debug, Parser)]
pub struct TransportCommand {
    #[clap(flatten)]
    pub calculation: CalculationArgs,

    /// Only confirm the global root, do not push group tables.
    #[arg(long, env = "SKIP_GROUP_TABLES")]
    pub skip_group_tables: bool,

    /// Destination chain to leave untouched. Can be repeated.
    #[arg(long = "skip-chain", value_name = "CHAIN_ID")]
    pub skip_chains: Vec<u64>,

    /// Reference timestamp put into certificates: the one read from the
    /// source block (`caller`) or the destination's latest (`destination`).
    #[arg(long, default_value_t = CertificateTimestamp::Caller)]
    pub certificate_timestamp: CertificateTimestamp,

    /// Delay between two destination chains, in milliseconds.
    #[arg(long, default_value_t = 2_000)]
    pub chain_pacing_ms: u64,

    /// Upper bound for waiting on a transaction receipt, in seconds.
    #[arg(long, default_value_t = 300)]
    pub receipt_timeout_secs: u64,
}

impl TransportCommand {
    fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            chain_pacing: Duration::from_millis(self.chain_pacing_ms),
            certificate_timestamp: self.certificate_timestamp,
            receipt_timeout: Duration::from_secs(self.receipt_timeout_secs),
        }
    }

    /// Execute the command.
    pub async fn exec(self, params: Params) -> Result<()> {
        let chain_settings = params.chain.into_config()?;
        let signer_config = params.signer.into_config()?;

        let tx_signer = signer_config.tx.build().await?;
        let bls_signer = signer_config.bls.build().await?;
        let network = Network::connect(&chain_settings).await?;

        let block = network.block_or_latest(self.calculation.block_number).await?;
        let timestamp = network
            .source
            .block_timestamp(block)
            .await
            .with_context(|| format!("failed to get block {block}"))?;
        let reference_timestamp = u32::try_from(timestamp)
            .with_context(|| format!("timestamp {timestamp} of block {block} overflows uint32"))?;

        tracing::info!(
            block,
            reference_timestamp,
            sender = %tx_signer.address(),
            "starting transport"
        );

        let calculated = network
            .calculator(&self.calculation)
            .calculate_root(block)
            .await
            .with_context(|| format!("failed to calculate stake table root at block {block}"))?;

        tracing::info!(
            root = %calculated.root,
            block,
            groups = calculated.distribution.len(),
            "calculated stake table root"
        );

        let transport = Transport::new(
            network.registry,
            network.chains,
            bls_signer,
            tx_signer,
            self.transport_config(),
        );

        let report = transport
            .confirm_global_root(
                calculated.root,
                reference_timestamp,
                block,
                &self.skip_chains,
            )
            .await
            .with_context(|| "failed to transport global table root")?;

        tracing::info!(
            confirmed = ?report.confirmed_chains(),
            skipped = ?report.skipped,
            "global table root transported"
        );

        if self.skip_group_tables {
            tracing::info!("group tables skipped");
        } else if calculated.is_empty() {
            tracing::info!("no groups, nothing else to transport");
        } else {
            let reports = transport
                .transport_all_group_tables(
                    reference_timestamp,
                    block,
                    calculated.root,
                    &calculated.tree,
                    &calculated.distribution,
                    &self.skip_chains,
                )
                .await
                .with_context(|| "failed to transport group tables")?;

            tracing::info!(groups = reports.len(), "group tables transported");
        }

        tracing::info!("transport completed");
        Ok(())
    }
}
