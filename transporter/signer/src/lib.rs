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

//! Signers used by the stake table transporter.
//!
//! Transactions are signed through [`TransactionSigner`], backed either by a
//! local secp256k1 key or by a remote key held in AWS KMS. Root updates are
//! certified with a BN254 BLS key through [`BlsSigner`].

use alloy::{
    consensus::{SignableTransaction, Signed, TxEip1559},
    primitives::{Address, B256, Signature},
};
use async_trait::async_trait;
use std::{fmt, sync::Arc};

pub mod bls;
pub mod ecdsa;
mod error;
pub mod kms;
mod local;

pub use bls::{AwsSecretStore, BlsSigner, InMemoryBlsSigner, SecretStore, SecretsManagerBlsSigner};
pub use error::{Result, SignerError};
pub use kms::{AwsKmsBackend, KmsBackend, RemoteKeySigner};
pub use local::LocalKeySigner;

/// Signs transaction hashes on behalf of a single account.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// Address of the signing account.
    fn address(&self) -> Address;

    /// Signs a prehashed message, returning a recoverable signature.
    async fn sign_hash(&self, hash: &B256) -> Result<Signature>;
}

/// Authorization context for transactions on one chain.
#[derive(Clone)]
pub struct TransactOpts {
    chain_id: u64,
    no_send: bool,
    signer: Arc<dyn TransactionSigner>,
}

impl TransactOpts {
    pub fn new(signer: Arc<dyn TransactionSigner>, chain_id: u64) -> Self {
        Self {
            chain_id,
            no_send: false,
            signer,
        }
    }

    /// Marks the context as a draft: transactions are built and signed but
    /// never broadcast.
    pub fn no_send(mut self) -> Self {
        self.no_send = true;
        self
    }

    pub fn is_no_send(&self) -> bool {
        self.no_send
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn from(&self) -> Address {
        self.signer.address()
    }

    pub async fn sign(&self, tx: TxEip1559) -> Result<Signed<TxEip1559>> {
        if tx.chain_id != self.chain_id {
            return Err(SignerError::ChainIdMismatch {
                expected: self.chain_id,
                actual: tx.chain_id,
            });
        }

        let signature = self.signer.sign_hash(&tx.signature_hash()).await?;
        Ok(tx.into_signed(signature))
    }
}

impl fmt::Debug for TransactOpts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactOpts")
            .field("chain_id", &self.chain_id)
            .field("from", &self.from())
            .field("no_send", &self.no_send)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Bytes, TxKind, U256};

    fn tx(chain_id: u64) -> TxEip1559 {
        TxEip1559 {
            chain_id,
            nonce: 3,
            gas_limit: 21_000,
            max_fee_per_gas: 2_000_000_000,
            max_priority_fee_per_gas: 1_000_000_000,
            to: TxKind::Call(Address::repeat_byte(0x42)),
            value: U256::ZERO,
            input: Bytes::from_static(&[1, 2, 3]),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn signs_for_scoped_chain() {
        let signer = Arc::new(LocalKeySigner::random());
        let opts = TransactOpts::new(signer.clone(), 17);
        assert!(!opts.is_no_send());
        assert_eq!(opts.from(), signer.address());

        let signed = opts.sign(tx(17)).await.unwrap();
        let recovered = signed
            .signature()
            .recover_address_from_prehash(&signed.signature_hash())
            .unwrap();
        assert_eq!(recovered, signer.address());
    }

    #[tokio::test]
    async fn rejects_foreign_chain() {
        let opts = TransactOpts::new(Arc::new(LocalKeySigner::random()), 17).no_send();
        assert!(opts.is_no_send());

        let err = opts.sign(tx(18)).await.unwrap_err();
        assert!(matches!(
            err,
            SignerError::ChainIdMismatch {
                expected: 17,
                actual: 18
            }
        ));
    }
}
