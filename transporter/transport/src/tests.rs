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

use super::*;
use transporter_calculator::{CalculatorConfig, StakeTableCalculator, StakeTableRoot};
use transporter_common::{Address, G1Point};
use transporter_ethereum::{
    ChainError,
    mock::{MockChain, MockRegistry, MockRegistryState},
};
use transporter_signer::{InMemoryBlsSigner, LocalKeySigner};

const TIMESTAMP: u32 = 1_700_000_500;
const BLOCK: u64 = 42;

struct Setup {
    transport: Transport,
    registry: MockRegistry,
    chains: Vec<MockChain>,
    bls: InMemoryBlsSigner,
}

fn groups(n: u32) -> Vec<GroupKey> {
    (0..n)
        .map(|i| GroupKey::new(Address::with_last_byte(0x10 + i as u8), i))
        .collect()
}

fn setup_with(chain_ids: &[u64], config: TransportConfig) -> Setup {
    let registry = MockRegistry::new(MockRegistryState {
        groups: groups(3),
        chains: chain_ids
            .iter()
            .map(|id| (*id, MockChain::VERIFIER))
            .collect(),
        ..Default::default()
    });

    let mut manager = ChainManager::new();
    let chains: Vec<_> = chain_ids.iter().map(|id| MockChain::new(*id)).collect();
    for (id, chain) in chain_ids.iter().zip(&chains) {
        manager.insert(*id, Arc::new(chain.clone())).unwrap();
    }

    let bls = InMemoryBlsSigner::from_hex("0x2a").unwrap();
    let transport = Transport::new(
        Arc::new(registry.clone()),
        manager,
        Arc::new(bls.clone()),
        Arc::new(LocalKeySigner::random()),
        config,
    );

    Setup {
        transport,
        registry,
        chains,
        bls,
    }
}

fn setup(chain_ids: &[u64]) -> Setup {
    setup_with(
        chain_ids,
        TransportConfig {
            chain_pacing: Duration::ZERO,
            ..Default::default()
        },
    )
}

async fn stake_table(registry: &MockRegistry) -> StakeTableRoot {
    StakeTableCalculator::new(Arc::new(registry.clone()), CalculatorConfig::default())
        .calculate_root(BLOCK)
        .await
        .unwrap()
}

#[tokio::test]
async fn confirms_root_on_every_chain() {
    let Setup {
        transport,
        registry,
        chains,
        bls,
    } = setup(&[1, 10, 100]);
    let table = stake_table(&registry).await;

    let report = transport
        .confirm_global_root(table.root, TIMESTAMP, BLOCK, &[])
        .await
        .unwrap();
    assert_eq!(report.confirmed_chains(), vec![1, 10, 100]);
    assert!(report.skipped.is_empty());
    assert!(
        report
            .confirmed
            .iter()
            .all(|c| c.submission.receipt().is_some_and(|r| r.success))
    );

    let message_hash = MockChain::message_hash(table.root, TIMESTAMP, BLOCK as u32);
    let signature: G1Point = bls.sign(&message_hash).await.unwrap();
    let apk = bls.public_key().await.unwrap();

    for chain in &chains {
        assert_eq!(chain.confirmed_root(TIMESTAMP).await, Some(table.root));

        let certificates = chain.certificates().await;
        assert_eq!(certificates.len(), 1);
        let certificate = Certificate::from(certificates[0].clone());
        assert_eq!(certificate.message_hash, message_hash);
        assert_ne!(certificate.message_hash, table.root);
        assert_eq!(certificate.reference_timestamp, TIMESTAMP);
        assert_eq!(certificate.signature, signature);
        assert_eq!(certificate.apk, apk);
    }
}

#[tokio::test]
async fn zero_root_is_a_noop() {
    let Setup {
        transport,
        registry,
        chains,
        ..
    } = setup(&[1, 2]);

    let report = transport
        .confirm_global_root(ZERO_ROOT, TIMESTAMP, BLOCK, &[])
        .await
        .unwrap();
    assert!(report.confirmed.is_empty());

    let report = transport
        .transport_group_table(
            TIMESTAMP,
            BLOCK,
            groups(1)[0],
            ZERO_ROOT,
            &MerkleTree::default(),
            &Distribution::new(),
            &[],
        )
        .await
        .unwrap();
    assert!(report.confirmed.is_empty());

    assert_eq!(registry.calls().await.supported_chains, 0);
    for chain in &chains {
        assert!(chain.sent().await.is_empty());
    }
}

#[tokio::test]
async fn empty_registry_flows_to_zero_transport_calls() {
    let Setup {
        transport,
        registry,
        chains,
        ..
    } = setup(&[1]);
    registry.state.write().await.groups.clear();

    let table = stake_table(&registry).await;
    assert!(table.is_empty());

    transport
        .confirm_global_root(table.root, TIMESTAMP, BLOCK, &[])
        .await
        .unwrap();
    let reports = transport
        .transport_all_group_tables(
            TIMESTAMP,
            BLOCK,
            table.root,
            &table.tree,
            &table.distribution,
            &[],
        )
        .await
        .unwrap();

    assert!(reports.is_empty());
    assert!(chains[0].sent().await.is_empty());
}

#[tokio::test]
async fn failure_reports_confirmed_chains() {
    let Setup {
        transport,
        registry,
        chains,
        ..
    } = setup(&[1, 2, 3]);
    let table = stake_table(&registry).await;
    chains[2].set_unreachable(true).await;

    let err = transport
        .confirm_global_root(table.root, TIMESTAMP, BLOCK, &[])
        .await
        .unwrap_err();

    let TransportError::Chain {
        chain_id,
        confirmed,
        ..
    } = &err
    else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(*chain_id, 3);
    assert_eq!(confirmed, &vec![1, 2]);
    assert_eq!(err.confirmed(), &[1, 2]);

    for chain in &chains[..2] {
        let updater = OperatorTableUpdater::new(Arc::new(chain.clone()), MockChain::VERIFIER);
        assert_eq!(
            updater.global_root_by_timestamp(TIMESTAMP).await.unwrap(),
            table.root
        );
    }
    assert_eq!(chains[2].confirmed_root(TIMESTAMP).await, None);
}

#[tokio::test]
async fn failed_receipt_aborts_loop() {
    let Setup {
        transport,
        registry,
        chains,
        ..
    } = setup(&[1, 2, 3]);
    let table = stake_table(&registry).await;
    chains[1].fail_next_transactions(1).await;

    let err = transport
        .confirm_global_root(table.root, TIMESTAMP, BLOCK, &[])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TransportError::Chain {
            chain_id: 2,
            stage: Stage::ConfirmGlobalRoot,
            source: ChainError::TransactionFailed { .. },
            ..
        }
    ));
    assert!(chains[2].sent().await.is_empty());
}

#[tokio::test]
async fn skips_listed_chains() {
    let Setup {
        transport,
        registry,
        chains,
        ..
    } = setup(&[1, 2, 3]);
    let table = stake_table(&registry).await;

    let report = transport
        .confirm_global_root(table.root, TIMESTAMP, BLOCK, &[2])
        .await
        .unwrap();

    assert_eq!(report.confirmed_chains(), vec![1, 3]);
    assert_eq!(report.skipped, vec![2]);
    assert!(chains[1].sent().await.is_empty());
    assert_eq!(chains[1].confirmed_root(TIMESTAMP).await, None);
}

#[tokio::test]
async fn missing_chain_client() {
    let Setup {
        transport,
        registry,
        ..
    } = setup(&[1]);
    registry
        .state
        .write()
        .await
        .chains
        .push((7, MockChain::VERIFIER));
    let table = stake_table(&registry).await;

    let err = transport
        .confirm_global_root(table.root, TIMESTAMP, BLOCK, &[])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TransportError::Chain {
            chain_id: 7,
            stage: Stage::ResolveChain,
            source: ChainError::ChainNotFound(7),
            ..
        }
    ));
    assert_eq!(err.confirmed(), &[1]);
}

#[tokio::test]
async fn legacy_verifier_gets_local_message_hash() {
    let Setup {
        transport,
        registry,
        chains,
        ..
    } = setup(&[1]);
    let table = stake_table(&registry).await;
    chains[0].set_message_hash_query(false).await;

    transport
        .confirm_global_root(table.root, TIMESTAMP, BLOCK, &[])
        .await
        .unwrap();

    let certificates = chains[0].certificates().await;
    assert_eq!(
        certificates[0].messageHash,
        global_root_message_hash(table.root, TIMESTAMP)
    );
    assert_eq!(chains[0].confirmed_root(TIMESTAMP).await, Some(table.root));
}

#[tokio::test]
async fn certificate_timestamp_source() {
    for (source, expected) in [
        (CertificateTimestamp::Caller, TIMESTAMP),
        (CertificateTimestamp::Destination, 1_600_000_000),
    ] {
        let Setup {
            transport,
            registry,
            chains,
            ..
        } = setup_with(
            &[1],
            TransportConfig {
                chain_pacing: Duration::ZERO,
                certificate_timestamp: source,
                ..Default::default()
            },
        );
        let table = stake_table(&registry).await;
        chains[0].set_latest_reference_timestamp(1_600_000_000).await;

        transport
            .confirm_global_root(table.root, TIMESTAMP, BLOCK, &[])
            .await
            .unwrap();

        let certificates = chains[0].certificates().await;
        assert_eq!(certificates[0].referenceTimestamp, expected, "{source}");
        // Call arguments always carry the caller supplied timestamp.
        assert_eq!(chains[0].confirmed_root(TIMESTAMP).await, Some(table.root));
    }
}

#[tokio::test]
async fn rejects_oversized_block() {
    let Setup {
        transport,
        registry,
        ..
    } = setup(&[1]);
    let table = stake_table(&registry).await;

    let err = transport
        .confirm_global_root(table.root, TIMESTAMP, u64::from(u32::MAX) + 1, &[])
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::BlockHeightOverflow(_)));
}

#[tokio::test]
async fn no_supported_chains() {
    let Setup {
        transport,
        registry,
        ..
    } = setup(&[]);
    let table = stake_table(&registry).await;

    let err = transport
        .confirm_global_root(table.root, TIMESTAMP, BLOCK, &[])
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::NoSupportedChains));
}

#[tokio::test]
async fn transports_group_tables_after_confirmation() {
    let Setup {
        transport,
        registry,
        chains,
        ..
    } = setup(&[1, 2]);
    let table = stake_table(&registry).await;

    transport
        .confirm_global_root(table.root, TIMESTAMP, BLOCK, &[])
        .await
        .unwrap();
    let reports = transport
        .transport_all_group_tables(
            TIMESTAMP,
            BLOCK,
            table.root,
            &table.tree,
            &table.distribution,
            &[],
        )
        .await
        .unwrap();
    assert_eq!(reports.len(), 3);

    for chain in &chains {
        let accepted = chain.accepted_tables().await;
        assert_eq!(accepted.len(), 3);
        for (i, (group, report)) in reports.iter().enumerate() {
            assert_eq!(report.confirmed_chains(), vec![1, 2]);
            assert_eq!(accepted[i].index, i as u32);
            assert_eq!(accepted[i].root, table.root);
            assert_eq!(accepted[i].reference_timestamp, TIMESTAMP);
            assert_eq!(&accepted[i].table, table.distribution.payload(group).unwrap());
        }
    }
}

#[tokio::test]
async fn group_table_rejected_without_confirmed_root() {
    let Setup {
        transport,
        registry,
        chains,
        ..
    } = setup(&[1]);
    let table = stake_table(&registry).await;
    let group = groups(3)[1];

    let err = transport
        .transport_group_table(
            TIMESTAMP,
            BLOCK,
            group,
            table.root,
            &table.tree,
            &table.distribution,
            &[],
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TransportError::Chain {
            chain_id: 1,
            stage: Stage::UpdateGroupTable,
            source: ChainError::Reverted(_),
            ..
        }
    ));
    assert!(chains[0].accepted_tables().await.is_empty());
}

#[tokio::test]
async fn unknown_group_is_not_found() {
    let Setup {
        transport,
        registry,
        chains,
        ..
    } = setup(&[1]);
    let table = stake_table(&registry).await;
    let stranger = GroupKey::new(Address::repeat_byte(0xff), 3);

    let err = transport
        .transport_group_table(
            TIMESTAMP,
            BLOCK,
            stranger,
            table.root,
            &table.tree,
            &table.distribution,
            &[],
        )
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::GroupNotFound(group) if group == stranger));
    assert!(chains[0].sent().await.is_empty());
}

#[tokio::test]
async fn group_table_skips_listed_chains() {
    let Setup {
        transport,
        registry,
        chains,
        ..
    } = setup(&[1, 2, 3]);
    let table = stake_table(&registry).await;
    let group = groups(3)[0];

    transport
        .confirm_global_root(table.root, TIMESTAMP, BLOCK, &[])
        .await
        .unwrap();
    let report = transport
        .transport_group_table(
            TIMESTAMP,
            BLOCK,
            group,
            table.root,
            &table.tree,
            &table.distribution,
            &[2],
        )
        .await
        .unwrap();

    assert_eq!(report.confirmed_chains(), vec![1, 3]);
    assert_eq!(report.skipped, vec![2]);
    assert!(chains[1].accepted_tables().await.is_empty());
    for chain in [&chains[0], &chains[2]] {
        let accepted = chain.accepted_tables().await;
        assert_eq!(accepted.len(), 1);
        assert_eq!(&accepted[0].table, table.distribution.payload(&group).unwrap());
    }
}

#[tokio::test(start_paused = true)]
async fn no_pacing_before_skipped_chains() {
    let pacing = Duration::from_secs(2);
    let Setup {
        transport,
        registry,
        ..
    } = setup_with(
        &[1, 2, 3],
        TransportConfig {
            chain_pacing: pacing,
            ..Default::default()
        },
    );
    let table = stake_table(&registry).await;

    // Paced between 1 and 2 only.
    let started = tokio::time::Instant::now();
    let report = transport
        .confirm_global_root(table.root, TIMESTAMP, BLOCK, &[3])
        .await
        .unwrap();
    assert_eq!(report.confirmed_chains(), vec![1, 2]);
    let elapsed = started.elapsed();
    assert!(elapsed >= pacing && elapsed < pacing * 2, "{elapsed:?}");

    let started = tokio::time::Instant::now();
    let report = transport
        .transport_group_table(
            TIMESTAMP,
            BLOCK,
            groups(3)[0],
            table.root,
            &table.tree,
            &table.distribution,
            &[2, 3],
        )
        .await
        .unwrap();
    assert_eq!(report.confirmed_chains(), vec![1]);
    assert!(started.elapsed() < pacing, "{:?}", started.elapsed());
}
