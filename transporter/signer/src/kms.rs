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

//! Transaction signing with a secp256k1 key held in a remote key store.

use crate::{Result, SignerError, TransactionSigner, ecdsa};
use alloy::primitives::{Address, B256, Signature};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_kms::{
    primitives::Blob,
    types::{MessageType, SigningAlgorithmSpec},
};

/// Minimal surface of a remote key store.
#[async_trait]
pub trait KmsBackend: Send + Sync {
    /// DER encoded SubjectPublicKeyInfo of the signing key.
    async fn public_key_der(&self) -> Result<Vec<u8>>;

    /// DER encoded ECDSA signature over a precomputed 32 byte digest.
    async fn sign_digest(&self, digest: &B256) -> Result<Vec<u8>>;
}

/// [`KmsBackend`] over AWS KMS.
pub struct AwsKmsBackend {
    client: aws_sdk_kms::Client,
    key_id: String,
}

impl AwsKmsBackend {
    pub async fn new(key_id: impl Into<String>, region: impl Into<String>) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.into()))
            .load()
            .await;

        Self {
            client: aws_sdk_kms::Client::new(&config),
            key_id: key_id.into(),
        }
    }
}

#[async_trait]
impl KmsBackend for AwsKmsBackend {
    async fn public_key_der(&self) -> Result<Vec<u8>> {
        let output = self
            .client
            .get_public_key()
            .key_id(&self.key_id)
            .send()
            .await
            .map_err(|err| SignerError::Kms(err.into_service_error().to_string()))?;

        output
            .public_key()
            .map(|blob| blob.as_ref().to_vec())
            .ok_or_else(|| SignerError::Kms(format!("key {} has no public key", self.key_id)))
    }

    async fn sign_digest(&self, digest: &B256) -> Result<Vec<u8>> {
        let output = self
            .client
            .sign()
            .key_id(&self.key_id)
            .message(Blob::new(digest.as_slice()))
            .message_type(MessageType::Digest)
            .signing_algorithm(SigningAlgorithmSpec::EcdsaSha256)
            .send()
            .await
            .map_err(|err| SignerError::Kms(err.into_service_error().to_string()))?;

        output
            .signature()
            .map(|blob| blob.as_ref().to_vec())
            .ok_or_else(|| SignerError::Kms("sign response has no signature".into()))
    }
}

/// Transaction signer delegating to a [`KmsBackend`].
///
/// The public key is fetched once on construction, signatures are
/// canonicalized to low `s` and given the recovery id matching the address.
pub struct RemoteKeySigner<B> {
    backend: B,
    address: Address,
}

impl<B: KmsBackend> RemoteKeySigner<B> {
    pub async fn new(backend: B) -> Result<Self> {
        let der = backend.public_key_der().await?;
        let address = ecdsa::address_from_public_key_der(&der)?;
        tracing::info!(%address, "remote signer initialized");

        Ok(Self { backend, address })
    }
}

#[async_trait]
impl<B: KmsBackend> TransactionSigner for RemoteKeySigner<B> {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_hash(&self, hash: &B256) -> Result<Signature> {
        let der = self.backend.sign_digest(hash).await?;
        ecdsa::signature_from_der(hash, &der, self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecdsa::{SECP256K1_HALF_ORDER, SECP256K1_ORDER};
    use alloy::primitives::{U256, keccak256};
    use k256::{
        ecdsa::{Signature as K256Signature, SigningKey},
        pkcs8::EncodePublicKey,
    };
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    /// Key store returning high `s` signatures, like real HSMs do half the time.
    struct MockKms {
        key: SigningKey,
        public_key_der: Vec<u8>,
        public_key_calls: Arc<AtomicUsize>,
    }

    impl MockKms {
        fn new(seed: u8) -> Self {
            let key = SigningKey::from_slice(&[seed; 32]).unwrap();
            let public_key_der = key
                .verifying_key()
                .to_public_key_der()
                .unwrap()
                .as_bytes()
                .to_vec();

            Self {
                key,
                public_key_der,
                public_key_calls: Default::default(),
            }
        }
    }

    #[async_trait]
    impl KmsBackend for MockKms {
        async fn public_key_der(&self) -> Result<Vec<u8>> {
            self.public_key_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.public_key_der.clone())
        }

        async fn sign_digest(&self, digest: &B256) -> Result<Vec<u8>> {
            let (signature, _) = self
                .key
                .sign_prehash_recoverable(digest.as_slice())
                .map_err(|err| SignerError::Kms(err.to_string()))?;
            let (r, s) = signature.split_bytes();
            let high_s = SECP256K1_ORDER - U256::from_be_slice(&s);

            let signature = K256Signature::from_scalars(r, high_s.to_be_bytes::<32>())
                .map_err(|err| SignerError::Kms(err.to_string()))?;
            Ok(signature.to_der().as_bytes().to_vec())
        }
    }

    struct BrokenKms;

    #[async_trait]
    impl KmsBackend for BrokenKms {
        async fn public_key_der(&self) -> Result<Vec<u8>> {
            Err(SignerError::Kms("access denied".into()))
        }

        async fn sign_digest(&self, _digest: &B256) -> Result<Vec<u8>> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn remote_signature_is_canonical_and_recoverable() {
        let kms = MockKms::new(0x33);
        let expected = Address::from_private_key(&kms.key);
        let calls = kms.public_key_calls.clone();

        let signer = RemoteKeySigner::new(kms).await.unwrap();
        assert_eq!(signer.address(), expected);

        for message in [&b"first"[..], b"second", b"third"] {
            let hash = keccak256(message);
            let signature = signer.sign_hash(&hash).await.unwrap();
            assert!(signature.s() <= SECP256K1_HALF_ORDER);
            assert_eq!(
                signature.recover_address_from_prehash(&hash).unwrap(),
                expected
            );
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn public_key_failure_propagates() {
        assert!(matches!(
            RemoteKeySigner::new(BrokenKms).await,
            Err(SignerError::Kms(_))
        ));
    }
}
