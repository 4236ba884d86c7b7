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

//! Index and payload bookkeeping for a single stake table calculation.

use crate::GroupKey;
use alloy_primitives::Bytes;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DistributionError {
    #[error("group {0} is listed more than once")]
    DuplicateGroup(GroupKey),
    #[error("group {0} has no index in the distribution")]
    UnknownGroup(GroupKey),
    #[error("group {0} has no payload in the distribution")]
    MissingPayload(GroupKey),
}

/// Maps every active group to its leaf index and its table payload.
///
/// Indices are dense and zero based; the index of a group is the position
/// of its leaf in the stake table merkle tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Distribution {
    index: HashMap<GroupKey, u64>,
    payload: HashMap<GroupKey, Bytes>,
}

impl Distribution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_groups(groups: &[GroupKey]) -> Result<Self, DistributionError> {
        let mut distribution = Self::new();
        distribution.set_groups(groups)?;
        Ok(distribution)
    }

    /// Assigns indices in input order, replacing any previous assignment.
    ///
    /// Payloads of groups which are no longer listed are discarded.
    pub fn set_groups(&mut self, groups: &[GroupKey]) -> Result<(), DistributionError> {
        let mut seen = HashSet::with_capacity(groups.len());
        if let Some(duplicate) = groups.iter().find(|group| !seen.insert(**group)) {
            return Err(DistributionError::DuplicateGroup(*duplicate));
        }

        self.index = groups
            .iter()
            .enumerate()
            .map(|(index, group)| (*group, index as u64))
            .collect();
        self.payload.retain(|group, _| seen.contains(group));

        Ok(())
    }

    pub fn index(&self, group: &GroupKey) -> Option<u64> {
        self.index.get(group).copied()
    }

    pub fn set_payload(&mut self, group: GroupKey, payload: Bytes) -> Result<(), DistributionError> {
        if !self.index.contains_key(&group) {
            return Err(DistributionError::UnknownGroup(group));
        }

        self.payload.insert(group, payload);
        Ok(())
    }

    pub fn payload(&self, group: &GroupKey) -> Option<&Bytes> {
        self.payload.get(group)
    }

    /// All indexed groups, in no particular order.
    pub fn groups(&self) -> Vec<GroupKey> {
        self.index.keys().copied().collect()
    }

    /// All indexed groups sorted by their leaf index.
    pub fn ordered_groups(&self) -> Vec<GroupKey> {
        let mut groups: Vec<_> = self.index.iter().map(|(k, v)| (*v, *k)).collect();
        groups.sort_unstable_by_key(|(index, _)| *index);
        groups.into_iter().map(|(_, group)| group).collect()
    }

    /// Payloads in leaf order, ready to be hashed into the tree.
    pub fn ordered_payloads(&self) -> Result<Vec<Bytes>, DistributionError> {
        self.ordered_groups()
            .into_iter()
            .map(|group| {
                self.payload
                    .get(&group)
                    .cloned()
                    .ok_or(DistributionError::MissingPayload(group))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
