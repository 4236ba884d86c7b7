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

//! secp256k1 post-processing for signatures produced by remote key stores.
//!
//! Remote signers return ASN.1 DER encoded `(r, s)` pairs without a recovery
//! id and without enforcing low `s`. Ethereum requires both.

use crate::{Result, SignerError};
use alloy::primitives::{Address, B256, Signature, U256, uint};
use k256::{
    PublicKey, ecdsa::Signature as DerSignature, elliptic_curve::sec1::ToEncodedPoint,
    pkcs8::DecodePublicKey,
};

/// Order `n` of the secp256k1 group.
pub const SECP256K1_ORDER: U256 =
    uint!(0xFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141_U256);

/// `n / 2`, the largest canonical `s`.
pub const SECP256K1_HALF_ORDER: U256 =
    uint!(0x7FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF5D576E7357A4501DDFE92F46681B20A0_U256);

/// Splits a DER encoded ECDSA signature into `(r, s)`.
pub fn parse_der_signature(der: &[u8]) -> Result<(U256, U256)> {
    let signature =
        DerSignature::from_der(der).map_err(|err| SignerError::InvalidDerSignature(err.to_string()))?;
    let (r, s) = signature.split_bytes();

    Ok((U256::from_be_slice(&r), U256::from_be_slice(&s)))
}

/// Derives the account address from a DER encoded SubjectPublicKeyInfo.
pub fn address_from_public_key_der(der: &[u8]) -> Result<Address> {
    let key = PublicKey::from_public_key_der(der)
        .map_err(|err| SignerError::InvalidPublicKey(err.to_string()))?;
    let point = key.to_encoded_point(false);

    Ok(Address::from_raw_public_key(&point.as_bytes()[1..]))
}

/// Maps `s` into the lower half of the group order.
pub fn normalize_s(s: U256) -> U256 {
    if s > SECP256K1_HALF_ORDER {
        SECP256K1_ORDER - s
    } else {
        s
    }
}

/// Finds the recovery id under which `(r, s)` recovers to `expected`.
pub fn recover_signature(hash: &B256, r: U256, s: U256, expected: Address) -> Result<Signature> {
    [false, true]
        .into_iter()
        .map(|y_parity| Signature::new(r, s, y_parity))
        .find(|signature| {
            signature
                .recover_address_from_prehash(hash)
                .is_ok_and(|address| address == expected)
        })
        .ok_or(SignerError::AddressMismatch { expected })
}

/// Turns a raw DER signature into a canonical recoverable one.
pub fn signature_from_der(hash: &B256, der: &[u8], expected: Address) -> Result<Signature> {
    let (r, s) = parse_der_signature(der)?;
    recover_signature(hash, r, normalize_s(s), expected)
}
