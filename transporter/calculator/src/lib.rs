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

//! Stake table root calculation.
//!
//! Reads every active group from the cross chain registry at a reference
//! block, fetches each group's operator table and commits to all of them
//! with a single merkle root.

use std::sync::Arc;
use transporter_common::{
    B256, Distribution, DistributionError, GroupKey, MerkleTree, ZERO_ROOT,
};
use transporter_ethereum::{ChainError, Registry};

mod pages;

pub use pages::Pages;

/// Groups requested per range call.
pub const DEFAULT_PAGE_SIZE: u64 = 50;

#[derive(Debug, thiserror::Error)]
pub enum CalculatorError {
    #[error("failed to fetch active group count at block {block}")]
    Count {
        block: u64,
        #[source]
        source: ChainError,
    },
    #[error("failed to fetch active groups for range [{start}, {end})")]
    Range {
        start: u64,
        end: u64,
        #[source]
        source: ChainError,
    },
    #[error("failed to calculate operator table for group {group}")]
    Payload {
        group: GroupKey,
        #[source]
        source: ChainError,
    },
    #[error("registry returned {actual} groups for range [{start}, {end})")]
    PageSize { start: u64, end: u64, actual: usize },
    #[error(transparent)]
    Distribution(#[from] DistributionError),
}

/// What happens when a single group's table cannot be computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PayloadFailurePolicy {
    /// Fail the whole calculation.
    #[default]
    Abort,
    /// Leave the group out of the tree and carry on.
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalculatorConfig {
    pub page_size: u64,
    pub payload_failure_policy: PayloadFailurePolicy,
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            payload_failure_policy: PayloadFailurePolicy::default(),
        }
    }
}

/// Result of a calculation, immutable once returned.
#[derive(Debug, Clone, Default)]
pub struct StakeTableRoot {
    pub reference_block: u64,
    pub root: B256,
    pub tree: MerkleTree,
    pub distribution: Distribution,
}

impl StakeTableRoot {
    /// True when no group was active, nothing needs transporting.
    pub fn is_empty(&self) -> bool {
        self.root == ZERO_ROOT
    }
}

pub struct StakeTableCalculator {
    registry: Arc<dyn Registry>,
    config: CalculatorConfig,
}

impl StakeTableCalculator {
    pub fn new(registry: Arc<dyn Registry>, config: CalculatorConfig) -> Self {
        Self { registry, config }
    }

    /// All active groups at `block`, in registry order.
    pub async fn active_groups(&self, block: u64) -> Result<Vec<GroupKey>, CalculatorError> {
        let count = self
            .registry
            .active_group_count(block)
            .await
            .map_err(|source| CalculatorError::Count { block, source })?;

        // Not sized from `count`, it is registry input.
        let mut groups = Vec::new();
        for range in Pages::new(count, self.config.page_size) {
            let page = self
                .registry
                .active_groups_by_range(block, range.start, range.end)
                .await
                .map_err(|source| CalculatorError::Range {
                    start: range.start,
                    end: range.end,
                    source,
                })?;

            // A mis-sized page would shift every later leaf.
            if page.len() as u64 != range.end - range.start {
                return Err(CalculatorError::PageSize {
                    start: range.start,
                    end: range.end,
                    actual: page.len(),
                });
            }

            tracing::debug!(
                block,
                start = range.start,
                end = range.end,
                fetched = page.len(),
                "fetched active groups page"
            );
            groups.extend(page);
        }

        Ok(groups)
    }

    pub async fn calculate_root(&self, block: u64) -> Result<StakeTableRoot, CalculatorError> {
        let groups = self.active_groups(block).await?;
        if groups.is_empty() {
            tracing::info!(block, "no active groups, stake table root is zero");
            return Ok(StakeTableRoot {
                reference_block: block,
                ..Default::default()
            });
        }

        let mut tables = Vec::with_capacity(groups.len());
        for group in groups {
            match self.registry.calculate_table_bytes(block, group).await {
                Ok(table) => tables.push((group, table)),
                Err(source) => match self.config.payload_failure_policy {
                    PayloadFailurePolicy::Abort => {
                        return Err(CalculatorError::Payload { group, source });
                    }
                    PayloadFailurePolicy::Skip => {
                        tracing::warn!(%group, block, error = %source, "skipping group without operator table");
                    }
                },
            }
        }

        let ordered: Vec<_> = tables.iter().map(|(group, _)| *group).collect();
        let mut distribution = Distribution::with_groups(&ordered)?;
        for (group, table) in tables {
            distribution.set_payload(group, table)?;
        }

        let tree = MerkleTree::new(&distribution.ordered_payloads()?);
        let root = tree.root();

        tracing::info!(
            block,
            %root,
            groups = distribution.len(),
            "calculated stake table root"
        );

        Ok(StakeTableRoot {
            reference_block: block,
            root,
            tree,
            distribution,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;
    use transporter_common::{Address, MerkleProof};
    use transporter_ethereum::mock::{MockRegistry, MockRegistryState};

    fn groups(n: u32) -> Vec<GroupKey> {
        (0..n)
            .map(|i| GroupKey::new(Address::with_last_byte((i % 7) as u8), i))
            .collect()
    }

    fn calculator(registry: &MockRegistry, policy: PayloadFailurePolicy) -> StakeTableCalculator {
        StakeTableCalculator::new(
            Arc::new(registry.clone()),
            CalculatorConfig {
                payload_failure_policy: policy,
                ..Default::default()
            },
        )
    }

    #[test_case(0, 0 ; "no groups")]
    #[test_case(1, 1 ; "single group")]
    #[test_case(49, 1 ; "one short of a page")]
    #[test_case(50, 1 ; "exactly one page")]
    #[test_case(51, 2 ; "one over a page")]
    #[test_case(125, 3 ; "partial last page")]
    #[tokio::test]
    async fn pagination(count: u32, range_calls: usize) {
        let registry = MockRegistry::with_groups(groups(count));
        let fetched = calculator(&registry, PayloadFailurePolicy::Abort)
            .active_groups(42)
            .await
            .unwrap();

        assert_eq!(fetched, groups(count));

        let calls = registry.calls().await;
        assert_eq!(calls.count, 1);
        assert_eq!(calls.ranges.len(), range_calls);
        if let Some((_, end)) = calls.ranges.last() {
            assert_eq!(*end, count as u64);
        }
        assert!(calls.ranges.iter().all(|(start, end)| end - start <= 50));
    }

    #[tokio::test]
    async fn three_groups() {
        let groups = groups(3);
        let registry = MockRegistry::with_groups(groups.clone());

        let result = calculator(&registry, PayloadFailurePolicy::Abort)
            .calculate_root(42)
            .await
            .unwrap();
        let again = calculator(&registry, PayloadFailurePolicy::Abort)
            .calculate_root(42)
            .await
            .unwrap();
        assert_eq!(result.root, again.root);
        assert_eq!(result.reference_block, 42);

        let tables: Vec<_> = groups.iter().map(MockRegistryState::table_bytes).collect();
        assert_eq!(result.root, MerkleTree::new(&tables).root());

        let index = result.distribution.index(&groups[1]).unwrap();
        assert_eq!(index, 1);
        let proof = result.tree.proof(index).unwrap();
        let flat = proof.flatten();
        let restored = MerkleProof::from_flattened(index, &flat).unwrap();
        assert!(restored.verify(result.root, &tables[1]));

        let absent = GroupKey::new(Address::repeat_byte(0xff), 3);
        assert_eq!(result.distribution.index(&absent), None);
        assert_eq!(result.distribution.payload(&absent), None);
    }

    #[tokio::test]
    async fn every_group_proves_against_root() {
        let groups = groups(77);
        let registry = MockRegistry::with_groups(groups.clone());
        let result = calculator(&registry, PayloadFailurePolicy::Abort)
            .calculate_root(1)
            .await
            .unwrap();

        assert_eq!(result.distribution.ordered_groups(), groups);
        for group in &groups {
            let index = result.distribution.index(group).unwrap();
            let payload = result.distribution.payload(group).unwrap();
            assert!(result.tree.proof(index).unwrap().verify(result.root, payload));
        }
    }

    #[tokio::test]
    async fn zero_groups_give_zero_root() {
        let registry = MockRegistry::with_groups(vec![]);
        let result = calculator(&registry, PayloadFailurePolicy::Abort)
            .calculate_root(5)
            .await
            .unwrap();

        assert!(result.is_empty());
        assert_eq!(result.root, ZERO_ROOT);
        assert!(result.distribution.is_empty());
        assert!(result.tree.is_empty());

        let calls = registry.calls().await;
        assert!(calls.ranges.is_empty());
        assert!(calls.tables.is_empty());
    }

    #[tokio::test]
    async fn count_failure_aborts_before_paging() {
        let registry = MockRegistry::new(MockRegistryState {
            groups: groups(10),
            fail_count: true,
            ..Default::default()
        });

        let err = calculator(&registry, PayloadFailurePolicy::Abort)
            .calculate_root(5)
            .await
            .unwrap_err();
        assert!(matches!(err, CalculatorError::Count { block: 5, .. }));
        assert!(registry.calls().await.ranges.is_empty());
    }

    #[tokio::test]
    async fn range_failure_names_the_range() {
        let registry = MockRegistry::new(MockRegistryState {
            groups: groups(120),
            failing_ranges: vec![50],
            ..Default::default()
        });

        let err = calculator(&registry, PayloadFailurePolicy::Abort)
            .calculate_root(5)
            .await
            .unwrap_err();
        assert!(matches!(err, CalculatorError::Range { start: 50, end: 100, .. }));
        assert_eq!(
            err.to_string(),
            "failed to fetch active groups for range [50, 100)"
        );
        assert!(registry.calls().await.tables.is_empty());
    }

    #[tokio::test]
    async fn payload_failure_aborts_by_default() {
        let groups = groups(4);
        let registry = MockRegistry::new(MockRegistryState {
            groups: groups.clone(),
            failing_groups: vec![groups[2]],
            ..Default::default()
        });

        let err = calculator(&registry, PayloadFailurePolicy::Abort)
            .calculate_root(5)
            .await
            .unwrap_err();
        assert!(matches!(err, CalculatorError::Payload { group, .. } if group == groups[2]));
        assert_eq!(registry.calls().await.tables, groups[..3].to_vec());
    }

    #[tokio::test]
    async fn payload_failure_skips_when_configured() {
        let groups = groups(4);
        let registry = MockRegistry::new(MockRegistryState {
            groups: groups.clone(),
            failing_groups: vec![groups[1]],
            ..Default::default()
        });

        let result = calculator(&registry, PayloadFailurePolicy::Skip)
            .calculate_root(5)
            .await
            .unwrap();

        let survivors = vec![groups[0], groups[2], groups[3]];
        assert_eq!(result.distribution.ordered_groups(), survivors);
        assert_eq!(result.distribution.index(&groups[1]), None);
        assert_eq!(result.distribution.index(&groups[3]), Some(2));

        let tables: Vec<_> = survivors.iter().map(MockRegistryState::table_bytes).collect();
        assert_eq!(result.root, MerkleTree::new(&tables).root());
    }

    #[tokio::test]
    async fn huge_count_fails_on_first_page() {
        let registry = MockRegistry::new(MockRegistryState {
            groups: groups(3),
            reported_count: Some(u64::MAX),
            ..Default::default()
        });

        let err = calculator(&registry, PayloadFailurePolicy::Abort)
            .active_groups(1)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CalculatorError::PageSize {
                start: 0,
                end: 50,
                actual: 3
            }
        ));
        assert_eq!(registry.calls().await.ranges, vec![(0, 50)]);
    }

    #[test_case(3, 2 ; "short page")]
    #[test_case(51, 50 ; "short last page")]
    #[tokio::test]
    async fn mis_sized_page_is_rejected(reported: u64, available: u32) {
        let registry = MockRegistry::new(MockRegistryState {
            groups: groups(available),
            reported_count: Some(reported),
            ..Default::default()
        });

        let err = calculator(&registry, PayloadFailurePolicy::Abort)
            .calculate_root(1)
            .await
            .unwrap_err();

        let start = (reported - 1) / 50 * 50;
        assert!(matches!(
            err,
            CalculatorError::PageSize { start: s, end, actual }
                if s == start && end == reported && actual == (available as u64 - start) as usize
        ));
        assert!(err.to_string().contains(&format!("[{start}, {reported})")));
        assert!(registry.calls().await.tables.is_empty());
    }
}
