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

//! Array-backed search tree over the splitters.
//!
//! Node `i` (1-based) has children `2i` and `2i + 1`. A record descends one
//! level per comparison, going right when it is not less than the node. After
//! `log2(buckets)` levels the node index lies in `[buckets, 2 * buckets)` and
//! the bucket is `index - buckets`.

use super::log2_ceil;
use crate::error::{Result, SortError};

/// Number of buckets used for `worker_count` workers: the next power of two.
pub fn bucket_count(worker_count: usize) -> usize {
    1 << log2_ceil(worker_count as u64)
}

/// Balanced classification tree built from `2^d - 1` sorted splitters.
#[derive(Debug)]
pub struct SplitterTree<T> {
    /// Node `i` is stored at `nodes[i - 1]`
    nodes: Vec<T>,
    levels: u32,
    buckets: usize,
}

impl<T: Clone> SplitterTree<T> {
    /// Builds the tree from sorted splitters. The number of splitters must be
    /// one less than a power of two; an empty slice gives a single bucket.
    pub fn build(splitters: &[T]) -> Result<Self> {
        let buckets = splitters.len() + 1;
        if !buckets.is_power_of_two() {
            return Err(SortError::Internal(format!(
                "{} splitters cannot form a complete tree",
                splitters.len()
            )));
        }

        let mut slots: Vec<Option<T>> = vec![None; buckets];
        if !splitters.is_empty() {
            fill(&mut slots, splitters, 0, splitters.len(), 1);
        }
        let nodes = slots
            .into_iter()
            .skip(1)
            .collect::<Option<Vec<T>>>()
            .ok_or_else(|| {
                SortError::Internal("splitter tree has unfilled nodes".to_string())
            })?;

        Ok(Self {
            nodes,
            levels: buckets.trailing_zeros(),
            buckets,
        })
    }
}

// median of [lo, hi) goes to slot idx, halves go to the children
fn fill<T: Clone>(slots: &mut [Option<T>], splitters: &[T], lo: usize, hi: usize, idx: usize) {
    let mid = lo + (hi - lo) / 2;
    slots[idx] = Some(splitters[mid].clone());
    if 2 * idx < splitters.len() {
        fill(slots, splitters, lo, mid, 2 * idx);
        fill(slots, splitters, mid + 1, hi, 2 * idx + 1);
    }
}

impl<T> SplitterTree<T> {
    /// Number of buckets (leaves)
    pub fn buckets(&self) -> usize {
        self.buckets
    }

    /// Depth of the tree
    pub fn levels(&self) -> u32 {
        self.levels
    }

    /// Bucket of `record`: the number of splitters not greater than it.
    #[inline]
    pub fn classify<C>(&self, record: &T, less: &C) -> usize
    where
        C: Fn(&T, &T) -> bool,
    {
        let mut j = 1;
        for _ in 0..self.levels {
            j = 2 * j + usize::from(!less(record, &self.nodes[j - 1]));
        }
        j - self.buckets
    }

    /// Classifies two records, walking both down the tree together.
    #[inline]
    pub fn classify_pair<C>(&self, first: &T, second: &T, less: &C) -> (usize, usize)
    where
        C: Fn(&T, &T) -> bool,
    {
        let mut j0 = 1;
        let mut j1 = 1;
        for _ in 0..self.levels {
            j0 = 2 * j0 + usize::from(!less(first, &self.nodes[j0 - 1]));
            j1 = 2 * j1 + usize::from(!less(second, &self.nodes[j1 - 1]));
        }
        (j0 - self.buckets, j1 - self.buckets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn less(a: &u32, b: &u32) -> bool {
        a < b
    }

    #[test]
    fn test_bucket_count() {
        assert_eq!(bucket_count(1), 1);
        assert_eq!(bucket_count(2), 2);
        assert_eq!(bucket_count(3), 4);
        assert_eq!(bucket_count(4), 4);
        assert_eq!(bucket_count(5), 8);
        assert_eq!(bucket_count(17), 32);
    }

    #[test]
    fn test_layout_is_median_recursion() -> Result<()> {
        let tree = SplitterTree::build(&[10, 20, 30, 40, 50, 60, 70])?;
        assert_eq!(tree.nodes, vec![40, 20, 60, 10, 30, 50, 70]);
        assert_eq!(tree.buckets(), 8);
        assert_eq!(tree.levels(), 3);
        Ok(())
    }

    #[test]
    fn test_rejects_incomplete_tree() {
        assert!(SplitterTree::build(&[1, 2]).is_err());
        assert!(SplitterTree::build(&[1, 2, 3, 4]).is_err());
    }

    #[test]
    fn test_empty_tree_has_one_bucket() -> Result<()> {
        let tree = SplitterTree::<u32>::build(&[])?;
        assert_eq!(tree.buckets(), 1);
        assert_eq!(tree.classify(&12345, &less), 0);
        assert_eq!(tree.classify_pair(&0, &u32::MAX, &less), (0, 0));
        Ok(())
    }

    #[test]
    fn test_boundaries_go_right() -> Result<()> {
        let tree = SplitterTree::build(&[10, 20, 30])?;
        assert_eq!(tree.classify(&9, &less), 0);
        assert_eq!(tree.classify(&10, &less), 1);
        assert_eq!(tree.classify(&19, &less), 1);
        assert_eq!(tree.classify(&20, &less), 2);
        assert_eq!(tree.classify(&30, &less), 3);
        assert_eq!(tree.classify(&u32::MAX, &less), 3);
        Ok(())
    }

    #[test]
    fn test_matches_binary_search() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(11);
        for depth in 1..=6 {
            let count = (1usize << depth) - 1;
            // small key range so duplicate splitters are common
            let mut splitters: Vec<u32> = (0..count).map(|_| rng.random_range(0..40)).collect();
            splitters.sort_unstable();
            let tree = SplitterTree::build(&splitters)?;

            for probe in 0..45 {
                let expected = splitters.partition_point(|s| !less(&probe, s));
                assert_eq!(
                    tree.classify(&probe, &less),
                    expected,
                    "probe {probe} splitters {splitters:?}"
                );
                let (a, b) = tree.classify_pair(&probe, &(44 - probe), &less);
                assert_eq!(a, expected);
                assert_eq!(b, splitters.partition_point(|s| !less(&(44 - probe), s)));
            }
        }
        Ok(())
    }

    #[test]
    fn test_padded_splitters_keep_padding_buckets_empty() -> Result<()> {
        // three workers, padded to four buckets
        let tree = SplitterTree::build(&[100, 200, 200])?;
        assert_eq!(tree.classify(&150, &less), 1);
        assert_eq!(tree.classify(&199, &less), 1);
        assert_eq!(tree.classify(&200, &less), 3);
        assert_eq!(tree.classify(&500, &less), 3);
        Ok(())
    }
}
