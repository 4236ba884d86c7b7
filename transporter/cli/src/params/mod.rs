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

//! Global options, read from the command line, the environment and
//! `.transporter.toml`.

use clap::Parser;
use serde::Deserialize;

mod chain;
mod signer;

pub use chain::{ChainParams, ChainSettings};
pub use signer::{BlsSignerSource, SignerConfig, SignerParams, TxSignerSource};

/// Combines two sets of parameters, `self` taking precedence.
pub trait MergeParams: Sized {
    fn merge(self, with: Self) -> Self;
}

#[derive(Clone, Debug, Default, Deserialize, Parser)]
#[serde(deny_unknown_fields)]
pub struct Params {
    /// Enable debug logging.
    #[arg(long, env = "DEBUG", global = true)]
    #[serde(default)]
    pub debug: bool,

    #[clap(flatten)]
    #[serde(default)]
    pub chain: ChainParams,

    #[clap(flatten)]
    #[serde(default)]
    pub signer: SignerParams,
}

impl MergeParams for Params {
    fn merge(self, with: Self) -> Self {
        Self {
            debug: self.debug || with.debug,
            chain: self.chain.merge(with.chain),
            signer: self.signer.merge(with.signer),
        }
    }
}
