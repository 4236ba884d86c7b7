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

//! Common types shared by the stake table transporter crates.

pub use alloy_primitives::{Address, B256, Bytes, U256};

pub mod certificate;
pub mod distribution;
pub mod group;
pub mod merkle;

pub use certificate::{
    Certificate, CertificateTimestamp, G1Point, G2Point, global_root_message_hash,
};
pub use distribution::{Distribution, DistributionError};
pub use group::GroupKey;
pub use merkle::{MerkleError, MerkleProof, MerkleTree};

/// Root reported when no groups are active at the reference block.
///
/// Destination chains treat it as "nothing to transport".
pub const ZERO_ROOT: B256 = B256::ZERO;
