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

//! Ethereum side of the stake table transporter.
//!
//! Chains are reached through [`ChainClient`]; the cross chain registry and
//! the operator table updater are thin wrappers issuing calls through it, and
//! [`TxSubmitter`] prices, signs and confirms transactions.

pub mod abi;
mod chain;
mod error;
mod manager;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod registry;
mod submitter;
mod verifier;

pub use chain::{AlloyChainClient, ChainClient, TxReceipt};
pub use error::{ChainError, Result};
pub use manager::{ChainConfig, ChainConfigError, ChainManager};
pub use registry::{Registry, RegistryQuery, SupportedChain};
pub use submitter::{
    FALLBACK_TIP_CAP, GAS_LIMIT_MARGIN_PERCENT, Submission, TxSubmitter, fee_cap,
    gas_limit_with_margin,
};
pub use verifier::{OperatorTableUpdater, VerifierAbi};
