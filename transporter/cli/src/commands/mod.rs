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

use crate::params::{ChainSettings, Params};
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::sync::Arc;
use transporter_calculator::{
    CalculatorConfig, DEFAULT_PAGE_SIZE, PayloadFailurePolicy, StakeTableCalculator,
};
use transporter_ethereum::{ChainClient, ChainManager, Registry, RegistryQuery};

mod calculate;
mod transport;

pub use calculate::CalculateCommand;
pub use transport::TransportCommand;

/// CLI command.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Calculate the stake table root at a source chain block and print it.
    Calculate(CalculateCommand),
    /// Calculate the stake table root, confirm it on every destination
    /// chain and push each group table.
    Transport(TransportCommand),
}

impl Command {
    /// Run the command.
    pub async fn exec(self, params: Params) -> Result<()> {
        match self {
            Self::Calculate(cmd) => cmd.exec(params).await,
            Self::Transport(cmd) => cmd.exec(params).await,
        }
    }
}

/// Options shared by every command computing a root.
#[derive(Debug, Clone, Args)]
pub struct CalculationArgs {
    /// Source chain block to calculate at. Latest when omitted.
    #[arg(long, env = "BLOCK_NUMBER")]
    pub block_number: Option<u64>,

    /// Registry page size used while listing active groups.
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE, value_parser = clap::value_parser!(u64).range(1..))]
    pub page_size: u64,

    /// Leave out groups whose operator table cannot be read instead of
    /// failing the whole calculation.
    #[arg(long)]
    pub skip_failed_groups: bool,
}

impl CalculationArgs {
    pub fn calculator_config(&self) -> CalculatorConfig {
        CalculatorConfig {
            page_size: self.page_size,
            payload_failure_policy: if self.skip_failed_groups {
                PayloadFailurePolicy::Skip
            } else {
                PayloadFailurePolicy::Abort
            },
        }
    }
}

/// Connected chains and the registry deployed on the source one.
struct Network {
    chains: ChainManager,
    source: Arc<dyn ChainClient>,
    registry: Arc<dyn Registry>,
}

impl Network {
    async fn connect(settings: &ChainSettings) -> Result<Self> {
        let chains = settings.connect().await?;
        let source = chains.chain(settings.source_chain_id)?;
        let registry: Arc<dyn Registry> =
            Arc::new(RegistryQuery::new(source.clone(), settings.registry));

        tracing::info!(
            source_chain_id = settings.source_chain_id,
            registry = %settings.registry,
            chains = ?chains.chain_ids(),
            "connected"
        );

        Ok(Self {
            chains,
            source,
            registry,
        })
    }

    async fn block_or_latest(&self, block: Option<u64>) -> Result<u64> {
        match block {
            Some(block) => Ok(block),
            None => self
                .source
                .block_number()
                .await
                .with_context(|| "failed to get latest block number"),
        }
    }

    fn calculator(&self, args: &CalculationArgs) -> StakeTableCalculator {
        StakeTableCalculator::new(self.registry.clone(), args.calculator_config())
    }
}
