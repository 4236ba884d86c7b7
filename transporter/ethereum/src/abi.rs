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

//! Solidity bindings for the registry and operator table updater contracts.

use transporter_common::{Certificate, G1Point, G2Point, GroupKey};

alloy::sol! {
    #[derive(Debug, PartialEq, Eq)]
    struct OperatorSet {
        address avs;
        uint32 id;
    }

    interface ICrossChainRegistry {
        function getActiveGenerationReservationCount() external view returns (uint256);

        function getActiveGenerationReservationsByRange(uint256 startIndex, uint256 endIndex)
            external
            view
            returns (OperatorSet[] memory);

        function calculateOperatorTableBytes(OperatorSet calldata operatorSet)
            external
            view
            returns (bytes memory);

        function getSupportedChains()
            external
            view
            returns (uint256[] memory chainIds, address[] memory operatorTableUpdaters);
    }

    #[derive(Debug, PartialEq, Eq)]
    struct BN254G1Point {
        uint256 X;
        uint256 Y;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct BN254G2Point {
        uint256[2] X;
        uint256[2] Y;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct BN254OperatorInfo {
        BN254G1Point pubkey;
        uint256[] weights;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct BN254OperatorInfoWitness {
        uint32 operatorIndex;
        bytes operatorInfoProof;
        BN254OperatorInfo operatorInfo;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct BN254Certificate {
        uint32 referenceTimestamp;
        bytes32 messageHash;
        BN254G1Point signature;
        BN254G2Point apk;
        BN254OperatorInfoWitness[] nonSignerWitnesses;
    }

    interface IOperatorTableUpdater {
        function confirmGlobalTableRoot(
            BN254Certificate calldata globalTableRootCert,
            bytes32 globalTableRoot,
            uint32 referenceTimestamp,
            uint32 referenceBlockNumber
        ) external;

        function updateOperatorTable(
            uint32 referenceTimestamp,
            bytes32 globalTableRoot,
            uint32 operatorSetIndex,
            bytes calldata proof,
            bytes calldata operatorTableBytes
        ) external;

        function getLatestReferenceTimestamp() external view returns (uint32);

        function getGlobalTableUpdateMessageHash(
            bytes32 globalTableRoot,
            uint32 referenceTimestamp,
            uint32 referenceBlockNumber
        ) external view returns (bytes32);

        function getGlobalTableRootByTimestamp(uint32 referenceTimestamp)
            external
            view
            returns (bytes32);
    }

    interface IOperatorTableUpdaterLegacy {
        function confirmGlobalTableRoot(
            BN254Certificate calldata globalTableRootCert,
            bytes32 globalTableRoot,
            uint32 referenceTimestamp
        ) external;
    }
}

impl From<GroupKey> for OperatorSet {
    fn from(group: GroupKey) -> Self {
        Self {
            avs: group.owner,
            id: group.id,
        }
    }
}

impl From<OperatorSet> for GroupKey {
    fn from(set: OperatorSet) -> Self {
        Self::new(set.avs, set.id)
    }
}

impl From<G1Point> for BN254G1Point {
    fn from(point: G1Point) -> Self {
        Self {
            X: point.x,
            Y: point.y,
        }
    }
}

impl From<G2Point> for BN254G2Point {
    fn from(point: G2Point) -> Self {
        Self {
            X: point.x,
            Y: point.y,
        }
    }
}

impl From<Certificate> for BN254Certificate {
    fn from(certificate: Certificate) -> Self {
        Self {
            referenceTimestamp: certificate.reference_timestamp,
            messageHash: certificate.message_hash,
            signature: certificate.signature.into(),
            apk: certificate.apk.into(),
            nonSignerWitnesses: vec![],
        }
    }
}

impl From<BN254Certificate> for Certificate {
    fn from(certificate: BN254Certificate) -> Self {
        Self {
            message_hash: certificate.messageHash,
            reference_timestamp: certificate.referenceTimestamp,
            signature: G1Point {
                x: certificate.signature.X,
                y: certificate.signature.Y,
            },
            apk: G2Point {
                x: certificate.apk.X,
                y: certificate.apk.Y,
            },
        }
    }
}
