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

use super::MergeParams;
use anyhow::{Context, Result, bail};
use clap::Parser;
use serde::Deserialize;
use std::sync::Arc;
use transporter_signer::{
    AwsKmsBackend, BlsSigner, InMemoryBlsSigner, LocalKeySigner, RemoteKeySigner,
    SecretsManagerBlsSigner, TransactionSigner,
};

/// Transaction and BLS key sources. Exactly one of each kind must be set.
#[derive(Clone, Debug, Default, Deserialize, Parser)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct SignerParams {
    /// Hex encoded secp256k1 key signing transactions.
    #[arg(long, env = "TX_PRIVATE_KEY", hide_env_values = true, global = true)]
    pub tx_private_key: Option<String>,

    /// AWS KMS key id signing transactions.
    #[arg(long, env = "TX_AWS_KMS_KEY_ID", global = true)]
    pub tx_aws_kms_key_id: Option<String>,

    /// AWS region of the KMS key [default: us-east-1].
    #[arg(long, env = "TX_AWS_REGION", global = true)]
    pub tx_aws_region: Option<String>,

    /// Hex encoded BN254 scalar signing certificates.
    #[arg(long, env = "BLS_PRIVATE_KEY", hide_env_values = true, global = true)]
    pub bls_private_key: Option<String>,

    /// AWS Secrets Manager secret holding the BLS key.
    #[arg(long, env = "BLS_AWS_SECRET_NAME", global = true)]
    pub bls_aws_secret_name: Option<String>,

    /// AWS region of the BLS secret [default: us-east-1].
    #[arg(long, env = "BLS_AWS_REGION", global = true)]
    pub bls_aws_region: Option<String>,
}

#[derive(Debug)]
pub enum TxSignerSource {
    Local(LocalKeySigner),
    Kms { key_id: String, region: String },
}

#[derive(Debug)]
pub enum BlsSignerSource {
    Local(InMemoryBlsSigner),
    SecretsManager { secret_name: String, region: String },
}

/// Validated [`SignerParams`]. Local keys are already parsed.
#[derive(Debug)]
pub struct SignerConfig {
    pub tx: TxSignerSource,
    pub bls: BlsSignerSource,
}

impl SignerParams {
    pub const DEFAULT_AWS_REGION: &str = "us-east-1";

    pub fn into_config(self) -> Result<SignerConfig> {
        let tx = match (self.tx_private_key, self.tx_aws_kms_key_id) {
            (Some(key), None) => TxSignerSource::Local(
                LocalKeySigner::from_hex(&key).with_context(|| "invalid `tx-private-key`")?,
            ),
            (None, Some(key_id)) => TxSignerSource::Kms {
                key_id,
                region: self
                    .tx_aws_region
                    .unwrap_or_else(|| Self::DEFAULT_AWS_REGION.into()),
            },
            (Some(_), Some(_)) => {
                bail!("`tx-private-key` and `tx-aws-kms-key-id` are mutually exclusive")
            }
            (None, None) => bail!("one of `tx-private-key` or `tx-aws-kms-key-id` is required"),
        };

        let bls = match (self.bls_private_key, self.bls_aws_secret_name) {
            (Some(key), None) => BlsSignerSource::Local(
                InMemoryBlsSigner::from_hex(&key).with_context(|| "invalid `bls-private-key`")?,
            ),
            (None, Some(secret_name)) => BlsSignerSource::SecretsManager {
                secret_name,
                region: self
                    .bls_aws_region
                    .unwrap_or_else(|| Self::DEFAULT_AWS_REGION.into()),
            },
            (Some(_), Some(_)) => {
                bail!("`bls-private-key` and `bls-aws-secret-name` are mutually exclusive")
            }
            (None, None) => {
                bail!("one of `bls-private-key` or `bls-aws-secret-name` is required")
            }
        };

        Ok(SignerConfig { tx, bls })
    }
}

impl TxSignerSource {
    pub async fn build(self) -> Result<Arc<dyn TransactionSigner>> {
        Ok(match self {
            Self::Local(signer) => Arc::new(signer),
            Self::Kms { key_id, region } => {
                let backend = AwsKmsBackend::new(key_id, region).await;
                let signer = RemoteKeySigner::new(backend)
                    .await
                    .with_context(|| "failed to load KMS transaction signer")?;
                Arc::new(signer)
            }
        })
    }
}

impl BlsSignerSource {
    pub async fn build(self) -> Result<Arc<dyn BlsSigner>> {
        Ok(match self {
            Self::Local(signer) => Arc::new(signer),
            Self::SecretsManager {
                secret_name,
                region,
            } => {
                let signer = SecretsManagerBlsSigner::from_aws(secret_name.clone(), region)
                    .await
                    .with_context(|| format!("failed to load BLS key from secret `{secret_name}`"))?;
                Arc::new(signer)
            }
        })
    }
}

impl MergeParams for SignerParams {
    fn merge(self, with: Self) -> Self {
        // A key source given on the command line replaces the file's one as
        // a whole, otherwise the two would clash.
        let (tx_private_key, tx_aws_kms_key_id) =
            if self.tx_private_key.is_some() || self.tx_aws_kms_key_id.is_some() {
                (self.tx_private_key, self.tx_aws_kms_key_id)
            } else {
                (with.tx_private_key, with.tx_aws_kms_key_id)
            };

        let (bls_private_key, bls_aws_secret_name) =
            if self.bls_private_key.is_some() || self.bls_aws_secret_name.is_some() {
                (self.bls_private_key, self.bls_aws_secret_name)
            } else {
                (with.bls_private_key, with.bls_aws_secret_name)
            };

        Self {
            tx_private_key,
            tx_aws_kms_key_id,
            tx_aws_region: self.tx_aws_region.or(with.tx_aws_region),
            bls_private_key,
            bls_aws_secret_name,
            bls_aws_region: self.bls_aws_region.or(with.bls_aws_region),
        }
    }
}
