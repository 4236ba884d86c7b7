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

/// Calculate the stake table root.
#[derive(Debug, Parser)]
pub struct CalculateCommand {
    #[clap(flatten)]
    pub calculation: CalculationArgs,
}

impl CalculateCommand {
    /// Execute the command.
    pub async fn exec(self, params: Params) -> Result<()> {
        let settings = params.chain.into_config()?;
        let network = Network::connect(&settings).await?;

        let block = network.block_or_latest(self.calculation.block_number).await?;
        tracing::info!(block, "starting calculation");

        let calculated = network
            .calculator(&self.calculation)
            .calculate_root(block)
            .await
            .with_context(|| format!("failed to calculate stake table root at block {block}"))?;

        let groups = calculated.distribution.ordered_groups();
        println!("Stake table root: {}", calculated.root);
        println!("Block number: {}", calculated.reference_block);
        println!("Tree leaves: {}", calculated.tree.leaf_count());
        println!("Groups: {}", groups.len());
        for (index, group) in groups.iter().enumerate() {
            println!("  [{index}] id: {}, owner: {}", group.id, group.owner);
        }

        Ok(())
    }
}
