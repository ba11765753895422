// Copyright 2026 by the timetabler authors
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except in compliance with
// the License. You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied. See the License for the
// specific language governing permissions and limitations under the License.

/// Finite domain of a model variable, stored as a bitset over the values `0..=Domain::MAX_VALUE`.
///
/// Subject indexes, room indexes and booleans all fit into this range, so a domain is a plain 16 byte value that can be
/// copied into every branch and bound node without any allocation.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Domain(u128);

impl Domain {
    /// Largest value representable in a domain
    pub const MAX_VALUE: i64 = 127;

    pub const EMPTY: Domain = Domain(0);
    pub const BOOL: Domain = Domain(0b11);

    /// Create a domain from a list of values. Returns None if any value is out of range.
    pub fn from_values<I: IntoIterator<Item = i64>>(values: I) -> Option<Domain> {
        let mut bits = 0u128;
        for v in values {
            if !(0..=Self::MAX_VALUE).contains(&v) {
                return None;
            }
            bits |= 1 << v;
        }
        Some(Domain(bits))
    }

    /// Create the domain `{lo, ..., hi}`
    pub fn range(lo: i64, hi: i64) -> Option<Domain> {
        Self::from_values(lo..=hi)
    }

    pub fn singleton(value: i64) -> Option<Domain> {
        Self::from_values(std::iter::once(value))
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn size(&self) -> u32 {
        self.0.count_ones()
    }

    pub fn is_fixed(&self) -> bool {
        self.size() == 1
    }

    pub fn contains(&self, value: i64) -> bool {
        (0..=Self::MAX_VALUE).contains(&value) && self.0 & (1 << value) != 0
    }

    /// Smallest value of the domain. Must not be called on an empty domain.
    pub fn min(&self) -> i64 {
        self.0.trailing_zeros() as i64
    }

    /// Largest value of the domain. Must not be called on an empty domain.
    pub fn max(&self) -> i64 {
        Self::MAX_VALUE - self.0.leading_zeros() as i64
    }

    /// The single value of a fixed domain
    pub fn value(&self) -> Option<i64> {
        if self.is_fixed() {
            Some(self.min())
        } else {
            None
        }
    }

    /// Remove `value` from the domain. Returns true if the domain changed.
    pub fn remove(&mut self, value: i64) -> bool {
        if self.contains(value) {
            self.0 &= !(1 << value);
            true
        } else {
            false
        }
    }

    /// Reduce the domain to `{value}` (or the empty domain, if `value` is not contained). Returns true if the domain
    /// changed.
    pub fn fix(&mut self, value: i64) -> bool {
        let new = if self.contains(value) { 1 << value } else { 0 };
        let changed = new != self.0;
        self.0 = new;
        changed
    }

    /// Remove all values outside of `lo..=hi`. Returns true if the domain changed.
    pub fn retain_range(&mut self, lo: i64, hi: i64) -> bool {
        if lo > hi || hi < 0 || lo > Self::MAX_VALUE {
            let changed = self.0 != 0;
            self.0 = 0;
            return changed;
        }
        let lo = lo.max(0) as u32;
        let hi = hi.min(Self::MAX_VALUE) as u32;
        let upper = if hi == 127 { u128::MAX } else { (1u128 << (hi + 1)) - 1 };
        let mask = upper & !((1u128 << lo) - 1);
        let new = self.0 & mask;
        let changed = new != self.0;
        self.0 = new;
        changed
    }

    pub fn intersect(&mut self, other: Domain) -> bool {
        let new = self.0 & other.0;
        let changed = new != self.0;
        self.0 = new;
        changed
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> {
        let bits = self.0;
        (0..=Self::MAX_VALUE).filter(move |v| bits & (1 << v) != 0)
    }
}

impl std::fmt::Debug for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
