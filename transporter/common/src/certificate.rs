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

//! Certificate authorizing a global stake table root on destination chains.

use alloy_primitives::{B256, U256, keccak256};
use derive_more::Display;

/// BN254 G1 point in affine coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct G1Point {
    pub x: U256,
    pub y: U256,
}

/// BN254 G2 point in affine coordinates.
///
/// Coordinates use the EIP-197 precompile order: the imaginary coefficient
/// comes first, i.e. `x = [x.c1, x.c0]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct G2Point {
    pub x: [U256; 2],
    pub y: [U256; 2],
}

/// Signature over a root update message plus the aggregate key it verifies
/// against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Certificate {
    /// Hash of the update message, not the root itself.
    pub message_hash: B256,
    pub reference_timestamp: u32,
    pub signature: G1Point,
    pub apk: G2Point,
}

/// Which timestamp goes into [`Certificate::reference_timestamp`].
///
/// The confirmation call arguments always carry the caller supplied
/// timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
pub enum CertificateTimestamp {
    /// Timestamp the caller passed in.
    #[default]
    #[display("caller")]
    Caller,
    /// Latest reference timestamp already recorded by the destination.
    #[display("destination")]
    Destination,
}

impl std::str::FromStr for CertificateTimestamp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "caller" => Ok(Self::Caller),
            "destination" => Ok(Self::Destination),
            other => Err(format!(
                "unknown certificate timestamp source `{other}`, expected `caller` or `destination`"
            )),
        }
    }
}

/// Message hash for destinations which cannot compute it themselves:
/// `keccak256(root ++ be_u32(timestamp))`.
pub fn global_root_message_hash(root: B256, reference_timestamp: u32) -> B256 {
    let mut buf = [0u8; 36];
    buf[..32].copy_from_slice(root.as_slice());
    buf[32..].copy_from_slice(&reference_timestamp.to_be_bytes());
    keccak256(buf)
}
