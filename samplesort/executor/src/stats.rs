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

use std::fmt::{Display, Formatter};

/// Sizes of the final partitions of one sort.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionStats {
    /// Records held by each worker, in rank order
    pub counts: Vec<usize>,
    /// Records held by all workers
    pub total: usize,
    /// Smallest partition
    pub min: usize,
    /// Largest partition
    pub max: usize,
    /// Largest partition relative to a perfectly even split. An empty
    /// dataset counts as perfectly balanced.
    pub imbalance: f64,
}

impl PartitionStats {
    /// Collects the statistics of `partitions`.
    pub fn from_partitions<T>(partitions: &[Vec<T>]) -> Self {
        let counts: Vec<usize> = partitions.iter().map(Vec::len).collect();
        let total = counts.iter().sum();
        let min = counts.iter().copied().min().unwrap_or(0);
        let max = counts.iter().copied().max().unwrap_or(0);
        let imbalance = if total == 0 {
            1.0
        } else {
            max as f64 / (total as f64 / counts.len() as f64)
        };
        Self {
            counts,
            total,
            min,
            max,
            imbalance,
        }
    }
}

impl Display for PartitionStats {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "workers={} total={} min={} max={} imbalance={:.3}",
            self.counts.len(),
            self.total,
            self.min,
            self.max,
            self.imbalance
        )
    }
}

/// Whether the concatenation of `partitions` in rank order is sorted by
/// `less`.
pub fn is_globally_ordered<T, C>(partitions: &[Vec<T>], less: C) -> bool
where
    C: Fn(&T, &T) -> bool,
{
    let mut records = partitions.iter().flatten();
    let Some(mut previous) = records.next() else {
        return true;
    };
    for record in records {
        if less(record, previous) {
            return false;
        }
        previous = record;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats() {
        let stats = PartitionStats::from_partitions(&[vec![1, 2, 3], vec![4], vec![5, 6]]);
        assert_eq!(stats.counts, vec![3, 1, 2]);
        assert_eq!(stats.total, 6);
        assert_eq!(stats.min, 1);
        assert_eq!(stats.max, 3);
        assert!((stats.imbalance - 1.5).abs() < 1e-9);
        assert_eq!(
            stats.to_string(),
            "workers=3 total=6 min=1 max=3 imbalance=1.500"
        );
    }

    #[test]
    fn test_empty_partitions_are_balanced() {
        let stats = PartitionStats::from_partitions::<u8>(&[vec![], vec![]]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.imbalance, 1.0);
    }

    #[test]
    fn test_global_order() {
        let lt = |a: &i32, b: &i32| a < b;
        assert!(is_globally_ordered(&[vec![1, 2], vec![], vec![2, 5]], lt));
        assert!(!is_globally_ordered(&[vec![1, 4], vec![3, 5]], lt));
        assert!(!is_globally_ordered(&[vec![2, 1]], lt));
        assert!(is_globally_ordered::<i32, _>(&[], lt));
    }
}
