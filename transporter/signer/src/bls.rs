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

//! BN254 BLS signing compatible with the on-chain `BN254` library.

use crate::{Result, SignerError};
use ark_bn254::{Bn254, Fq, Fr, G1Affine, G2Affine};
use ark_ec::{AffineRepr, CurveGroup, pairing::Pairing};
use ark_ff::{BigInteger, Field, PrimeField, Zero};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use std::fmt;
use transporter_common::{B256, G1Point, G2Point, U256};

/// Produces BLS signatures over message hashes.
#[async_trait]
pub trait BlsSigner: Send + Sync {
    /// Signs `H(message_hash)` where `H` maps onto G1.
    async fn sign(&self, message_hash: &B256) -> Result<G1Point>;

    /// G2 public key matching the signatures.
    async fn public_key(&self) -> Result<G2Point>;
}

/// Maps a 32 byte hash onto G1 by try-and-increment.
pub fn hash_to_g1(message_hash: &B256) -> G1Affine {
    let three = Fq::from(3u64);
    // (p + 1) / 4
    let mut exponent = Fq::MODULUS;
    exponent.add_with_carry(&1u64.into());
    exponent.div2();
    exponent.div2();

    let mut x = Fq::from_be_bytes_mod_order(message_hash.as_slice());
    loop {
        let beta = x.square() * x + three;
        let y = beta.pow(exponent);
        if y.square() == beta {
            return G1Affine::new_unchecked(x, y);
        }
        x += Fq::from(1u64);
    }
}

fn fq_to_u256(value: &Fq) -> U256 {
    U256::from_be_slice(&value.into_bigint().to_bytes_be())
}

pub fn g1_to_point(point: &G1Affine) -> G1Point {
    G1Point {
        x: fq_to_u256(&point.x),
        y: fq_to_u256(&point.y),
    }
}

pub fn g2_to_point(point: &G2Affine) -> G2Point {
    G2Point {
        x: [fq_to_u256(&point.x.c1), fq_to_u256(&point.x.c0)],
        y: [fq_to_u256(&point.y.c1), fq_to_u256(&point.y.c0)],
    }
}

fn parse_secret_key(key: &str) -> Result<Fr> {
    let bytes = hex::decode(key.trim().trim_start_matches("0x"))
        .map_err(|err| SignerError::InvalidPrivateKey(err.to_string()))?;
    if bytes.is_empty() || bytes.len() > 32 {
        return Err(SignerError::InvalidPrivateKey(format!(
            "expected up to 32 bytes, got {}",
            bytes.len()
        )));
    }

    let secret = Fr::from_be_bytes_mod_order(&bytes);
    if secret.is_zero() {
        return Err(SignerError::InvalidPrivateKey(
            "BLS secret key must not be zero".into(),
        ));
    }

    Ok(secret)
}

/// BLS key held in process memory.
#[derive(Clone)]
pub struct InMemoryBlsSigner {
    secret: Fr,
    public: G2Affine,
}

impl InMemoryBlsSigner {
    pub fn new(secret: Fr) -> Result<Self> {
        if secret.is_zero() {
            return Err(SignerError::InvalidPrivateKey(
                "BLS secret key must not be zero".into(),
            ));
        }

        let public = (G2Affine::generator() * secret).into_affine();
        Ok(Self { secret, public })
    }

    pub fn from_hex(key: &str) -> Result<Self> {
        Self::new(parse_secret_key(key)?)
    }

    pub fn sign_g1(&self, message_hash: &B256) -> G1Affine {
        (hash_to_g1(message_hash) * self.secret).into_affine()
    }

    pub fn public_g2(&self) -> G2Affine {
        self.public
    }
}

impl fmt::Debug for InMemoryBlsSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryBlsSigner")
            .field("public", &g2_to_point(&self.public))
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl BlsSigner for InMemoryBlsSigner {
    async fn sign(&self, message_hash: &B256) -> Result<G1Point> {
        Ok(g1_to_point(&self.sign_g1(message_hash)))
    }

    async fn public_key(&self) -> Result<G2Point> {
        Ok(g2_to_point(&self.public))
    }
}

/// Verifies `e(signature, G2) == e(H(m), public)`.
pub fn verify(message_hash: &B256, signature: &G1Affine, public: &G2Affine) -> bool {
    Bn254::pairing(*signature, G2Affine::generator())
        == Bn254::pairing(hash_to_g1(message_hash), *public)
}

/// Store holding secret strings by name.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Current string value of the secret `name`.
    async fn secret_string(&self, name: &str) -> Result<String>;
}

/// [`SecretStore`] over AWS Secrets Manager.
pub struct AwsSecretStore {
    client: aws_sdk_secretsmanager::Client,
}

impl AwsSecretStore {
    pub async fn new(region: impl Into<String>) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.into()))
            .load()
            .await;

        Self {
            client: aws_sdk_secretsmanager::Client::new(&config),
        }
    }
}

#[async_trait]
impl SecretStore for AwsSecretStore {
    async fn secret_string(&self, name: &str) -> Result<String> {
        let output = self
            .client
            .get_secret_value()
            .secret_id(name)
            .version_stage("AWSCURRENT")
            .send()
            .await
            .map_err(|err| SignerError::SecretsManager(err.into_service_error().to_string()))?;

        output
            .secret_string()
            .map(str::to_owned)
            .ok_or_else(|| SignerError::SecretsManager(format!("secret `{name}` has no string value")))
    }
}

/// BLS key stored as a hex string in a [`SecretStore`].
///
/// The secret is read once on construction, so every signature of a run
/// matches the public key reported for it.
#[derive(Clone)]
pub struct SecretsManagerBlsSigner {
    secret_name: String,
    signer: InMemoryBlsSigner,
}

impl SecretsManagerBlsSigner {
    pub async fn new<S: SecretStore + ?Sized>(
        store: &S,
        secret_name: impl Into<String>,
    ) -> Result<Self> {
        let secret_name = secret_name.into();
        let secret = store.secret_string(&secret_name).await?;
        let signer = InMemoryBlsSigner::from_hex(secret.trim())?;

        tracing::debug!(secret = %secret_name, "loaded BLS key from secret store");

        Ok(Self {
            secret_name,
            signer,
        })
    }

    /// Loads the key from AWS Secrets Manager in `region`.
    pub async fn from_aws(secret_name: impl Into<String>, region: impl Into<String>) -> Result<Self> {
        Self::new(&AwsSecretStore::new(region).await, secret_name).await
    }

    pub fn secret_name(&self) -> &str {
        &self.secret_name
    }
}

impl fmt::Debug for SecretsManagerBlsSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretsManagerBlsSigner")
            .field("secret_name", &self.secret_name)
            .field("signer", &self.signer)
            .finish()
    }
}

#[async_trait]
impl BlsSigner for SecretsManagerBlsSigner {
    async fn sign(&self, message_hash: &B256) -> Result<G1Point> {
        self.signer.sign(message_hash).await
    }

    async fn public_key(&self) -> Result<G2Point> {
        self.signer.public_key().await
    }
}
