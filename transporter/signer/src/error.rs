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

use alloy::primitives::Address;

#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("invalid DER signature: {0}")]
    InvalidDerSignature(String),
    #[error("recovered public key does not match expected address {expected}")]
    AddressMismatch { expected: Address },
    #[error("transaction is for chain {actual}, signer is scoped to chain {expected}")]
    ChainIdMismatch { expected: u64, actual: u64 },
    #[error("KMS request failed: {0}")]
    Kms(String),
    #[error("secrets manager request failed: {0}")]
    SecretsManager(String),
    #[error("signing failed: {0}")]
    Signing(String),
}

pub type Result<T, E = SignerError> = std::result::Result<T, E>;
