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

use crate::{Result, SignerError, TransactionSigner};
use alloy::{
    primitives::{Address, B256, Signature},
    signers::{SignerSync, local::PrivateKeySigner},
};
use async_trait::async_trait;

/// Transaction signer holding a secp256k1 private key in memory.
#[derive(Debug, Clone)]
pub struct LocalKeySigner {
    inner: PrivateKeySigner,
}

impl LocalKeySigner {
    /// Parses a hex encoded private key, `0x` prefix optional.
    pub fn from_hex(key: &str) -> Result<Self> {
        let inner = key
            .trim()
            .parse::<PrivateKeySigner>()
            .map_err(|err| SignerError::InvalidPrivateKey(err.to_string()))?;

        Ok(Self { inner })
    }

    pub fn random() -> Self {
        Self {
            inner: PrivateKeySigner::random(),
        }
    }
}

#[async_trait]
impl TransactionSigner for LocalKeySigner {
    fn address(&self) -> Address {
        self.inner.address()
    }

    async fn sign_hash(&self, hash: &B256) -> Result<Signature> {
        self.inner
            .sign_hash_sync(hash)
            .map_err(|err| SignerError::Signing(err.to_string()))
    }
}
