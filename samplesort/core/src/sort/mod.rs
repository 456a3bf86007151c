// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Distributed sample sort.
//!
//! The operator reorders a dataset spread over many workers using only local
//! sorts and a single all-to-all exchange:
//!
//! 1. every worker buffers its input ([`LocalAccumulator`]),
//! 2. a prefix sum and a global sum of the local sizes are computed,
//! 3. every worker sends a random sample to rank 0 ([`Sampler`]),
//! 4. rank 0 sorts the merged sample, picks evenly spaced splitters and
//!    broadcasts them ([`SplitterCoordinator`]),
//! 5. every worker classifies its records through a [`SplitterTree`] and ships
//!    each record to the worker owning its bucket ([`Redistributor`]),
//! 6. every worker sorts what it received ([`LocalSorter`]).
//!
//! Orderings are supplied as a `less(a, b)` predicate which must be a strict
//! weak order. Records for which neither `less(a, b)` nor `less(b, a)` holds
//! are equivalent.

use std::cmp::Ordering;

mod accumulator;
mod local_sort;
mod metrics;
mod operator;
mod redistribute;
mod sampler;
mod splitters;
mod tree;

pub use accumulator::LocalAccumulator;
pub use local_sort::LocalSorter;
pub use metrics::SortMetrics;
pub use operator::SortOperator;
pub use redistribute::Redistributor;
pub use sampler::{sample_size, Sampler};
pub use splitters::{pad_splitters, select_splitters, SplitterCoordinator};
pub use tree::{bucket_count, SplitterTree};

/// Whether `a` and `b` are equivalent under `less`.
#[inline]
pub fn equivalent<T, C>(less: &C, a: &T, b: &T) -> bool
where
    C: Fn(&T, &T) -> bool,
{
    !less(a, b) && !less(b, a)
}

/// Turns a `less` predicate into an [`Ordering`] for the slice sort methods.
#[inline]
pub(crate) fn ordering_of<T, C>(less: &C, a: &T, b: &T) -> Ordering
where
    C: Fn(&T, &T) -> bool,
{
    if less(a, b) {
        Ordering::Less
    } else if less(b, a) {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}

/// `ceil(log2(n))`, with `log2_ceil(0) == log2_ceil(1) == 0`.
#[inline]
pub fn log2_ceil(n: u64) -> u32 {
    if n <= 1 {
        0
    } else {
        u64::BITS - (n - 1).leading_zeros()
    }
}
