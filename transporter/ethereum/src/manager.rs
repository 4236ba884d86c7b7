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

use crate::{AlloyChainClient, ChainClient, ChainError, Result};
use std::{collections::HashMap, fmt, str::FromStr, sync::Arc};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainConfigError {
    #[error("chain config `{0}` must look like `<chain id>:<rpc url>`")]
    Format(String),
    #[error("invalid chain id `{0}`")]
    ChainId(String),
    #[error("invalid rpc url `{url}`: {reason}")]
    RpcUrl { url: String, reason: String },
}

/// One destination or source chain endpoint, written as `<chain id>:<rpc url>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub rpc_url: Url,
}

impl FromStr for ChainConfig {
    type Err = ChainConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (chain_id, rpc_url) = s
            .split_once(':')
            .ok_or_else(|| ChainConfigError::Format(s.to_string()))?;

        let chain_id = chain_id
            .trim()
            .parse()
            .map_err(|_| ChainConfigError::ChainId(chain_id.to_string()))?;
        let rpc_url = rpc_url
            .trim()
            .parse()
            .map_err(|err: url::ParseError| ChainConfigError::RpcUrl {
                url: rpc_url.to_string(),
                reason: err.to_string(),
            })?;

        Ok(Self { chain_id, rpc_url })
    }
}

impl fmt::Display for ChainConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chain_id, self.rpc_url)
    }
}

/// Chain clients keyed by chain id.
#[derive(Default, Clone)]
pub struct ChainManager {
    chains: HashMap<u64, Arc<dyn ChainClient>>,
}

impl ChainManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects to the configured endpoint and checks it serves the expected chain.
    pub async fn add_chain(&mut self, config: &ChainConfig) -> Result<()> {
        if self.chains.contains_key(&config.chain_id) {
            return Err(ChainError::DuplicateChain(config.chain_id));
        }

        let client = AlloyChainClient::connect(config.rpc_url.as_str()).await?;
        let actual = client.chain_id().await?;
        if actual != config.chain_id {
            return Err(ChainError::ChainIdMismatch {
                expected: config.chain_id,
                actual,
            });
        }

        tracing::info!(chain_id = config.chain_id, "connected to chain");
        self.insert(config.chain_id, Arc::new(client))
    }

    pub fn insert(&mut self, chain_id: u64, client: Arc<dyn ChainClient>) -> Result<()> {
        if self.chains.contains_key(&chain_id) {
            return Err(ChainError::DuplicateChain(chain_id));
        }

        self.chains.insert(chain_id, client);
        Ok(())
    }

    pub fn chain(&self, chain_id: u64) -> Result<Arc<dyn ChainClient>> {
        self.chains
            .get(&chain_id)
            .cloned()
            .ok_or(ChainError::ChainNotFound(chain_id))
    }

    pub fn chain_ids(&self) -> Vec<u64> {
        let mut ids: Vec<_> = self.chains.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl fmt::Debug for ChainManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainManager")
            .field("chains", &self.chain_ids())
            .finish()
    }
}
