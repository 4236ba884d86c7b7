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

use std::ops::Range;

/// Half open `[start, end)` ranges covering `0..total` in steps of `page_size`.
///
/// Single pass: once exhausted it stays exhausted.
#[derive(Debug, Clone)]
pub struct Pages {
    next: u64,
    total: u64,
    page_size: u64,
}

impl Pages {
    pub fn new(total: u64, page_size: u64) -> Self {
        Self {
            next: 0,
            total,
            page_size: page_size.max(1),
        }
    }
}

impl Iterator for Pages {
    type Item = Range<u64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.total {
            return None;
        }

        let start = self.next;
        let end = start.saturating_add(self.page_size).min(self.total);
        self.next = end;

        Some(start..end)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total.saturating_sub(self.next).div_ceil(self.page_size) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Pages {}
