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

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

/// Key used for every record of [`KeyDistribution::Duplicates`].
pub const DUPLICATE_KEY: u64 = 42;

/// Shape of a generated dataset
#[derive(Clone, Copy, Debug, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "build-binary", derive(clap::ValueEnum))]
pub enum KeyDistribution {
    /// Random keys, each record placed on a random worker
    #[default]
    Uniform,
    /// The same key everywhere, split evenly over the workers
    Duplicates,
    /// Ascending contiguous ranges, rotated across the workers
    Presorted,
}

#[cfg(feature = "build-binary")]
impl std::str::FromStr for KeyDistribution {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        clap::ValueEnum::from_str(s, true)
    }
}

#[cfg(feature = "build-binary")]
impl std::fmt::Display for KeyDistribution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyDistribution::Uniform => write!(f, "uniform"),
            KeyDistribution::Duplicates => write!(f, "duplicates"),
            KeyDistribution::Presorted => write!(f, "presorted"),
        }
    }
}

/// Generates `records` keys spread over `workers` input partitions.
pub fn generate(
    distribution: KeyDistribution,
    records: usize,
    workers: usize,
    seed: u64,
) -> Vec<Vec<u64>> {
    if workers == 0 {
        return vec![];
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut partitions = vec![Vec::new(); workers];
    match distribution {
        KeyDistribution::Uniform => {
            for _ in 0..records {
                let worker = rng.random_range(0..workers);
                partitions[worker].push(rng.random::<u64>());
            }
        }
        KeyDistribution::Duplicates => {
            for (i, partition) in partitions.iter_mut().enumerate() {
                partition.resize(share(records, workers, i), DUPLICATE_KEY);
            }
        }
        KeyDistribution::Presorted => {
            let offset = rng.random_range(0..workers);
            let mut next = 0u64;
            for i in 0..workers {
                let len = share(records, workers, i) as u64;
                partitions[(i + offset) % workers].extend(next..next + len);
                next += len;
            }
        }
    }
    partitions
}

// records of worker i when splitting evenly
fn share(records: usize, workers: usize, i: usize) -> usize {
    (i + 1) * records / workers - i * records / workers
}
