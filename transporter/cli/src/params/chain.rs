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

use super::MergeParams;
use anyhow::{Context, Result, anyhow, ensure};
use clap::Parser;
use serde::Deserialize;
use std::collections::HashSet;
use transporter_common::Address;
use transporter_ethereum::{ChainConfig, ChainManager};

/// Source chain registry and chain endpoints.
#[derive(Clone, Debug, Default, Deserialize, Parser)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ChainParams {
    /// Cross chain registry contract on the source chain.
    #[arg(long, env = "CROSS_CHAIN_REGISTRY_ADDRESS", global = true)]
    pub cross_chain_registry: Option<String>,

    /// Chain endpoints as `<chain id>:<rpc url>`.
    /// The first entry is the source chain the registry lives on.
    #[arg(
        long,
        env = "CHAINS",
        value_delimiter = ',',
        value_name = "CHAIN_ID:RPC_URL",
        global = true
    )]
    pub chains: Option<Vec<String>>,
}

/// Validated [`ChainParams`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainSettings {
    pub registry: Address,
    pub source_chain_id: u64,
    pub chains: Vec<ChainConfig>,
}

impl ChainParams {
    pub fn into_config(self) -> Result<ChainSettings> {
        let registry = self
            .cross_chain_registry
            .ok_or_else(|| anyhow!("missing `cross-chain-registry`"))?
            .parse()
            .with_context(|| "invalid `cross-chain-registry`")?;

        let chains = self
            .chains
            .unwrap_or_default()
            .iter()
            .map(|chain| {
                chain
                    .parse::<ChainConfig>()
                    .with_context(|| format!("invalid chain `{chain}`"))
            })
            .collect::<Result<Vec<_>>>()?;

        let source_chain_id = chains
            .first()
            .map(|chain| chain.chain_id)
            .ok_or_else(|| anyhow!("no chains configured"))?;

        let mut seen = HashSet::new();
        for chain in &chains {
            ensure!(
                seen.insert(chain.chain_id),
                "chain {} configured more than once",
                chain.chain_id
            );
        }

        Ok(ChainSettings {
            registry,
            source_chain_id,
            chains,
        })
    }
}

impl ChainSettings {
    /// Connects every configured chain, checking each endpoint's chain id.
    pub async fn connect(&self) -> Result<ChainManager> {
        let mut manager = ChainManager::new();
        for chain in &self.chains {
            manager
                .add_chain(chain)
                .await
                .with_context(|| format!("failed to connect to chain {}", chain.chain_id))?;
        }

        Ok(manager)
    }
}

impl MergeParams for ChainParams {
    fn merge(self, with: Self) -> Self {
        // Order matters, the first chain is the source one.
        Self {
            cross_chain_registry: self.cross_chain_registry.or(with.cross_chain_registry),
            chains: self.chains.or(with.chains),
        }
    }
}
