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

//! Random sampling for splitter estimation.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::log2_ceil;
use crate::error::Result;
use crate::transport::DataWriter;

/// Number of samples each worker draws for a job of `total_records` records.
///
/// This is the `ceil(log2(n)) / epsilon^2` bound for epsilon-approximate
/// quantiles from uniform sampling.
pub fn sample_size(total_records: u64, desired_imbalance: f64) -> usize {
    let factor = 1.0 / (desired_imbalance * desired_imbalance);
    (log2_ceil(total_records) as f64 * factor) as usize
}

/// Draws uniform samples with replacement from a worker's local records.
pub struct Sampler<R = StdRng> {
    rng: R,
}

impl Sampler<StdRng> {
    /// Seeds the sampler from `seed` mixed with `rank`, or from the OS when
    /// no seed is given.
    pub fn for_worker(seed: Option<u64>, rank: usize) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(
                seed ^ (rank as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15),
            ),
            None => StdRng::from_os_rng(),
        };
        Self { rng }
    }
}

impl<R: Rng> Sampler<R> {
    /// Wraps an existing random source.
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Draws `count` records. An empty input yields no samples.
    pub fn draw<T: Clone>(&mut self, records: &[T], count: usize) -> Vec<T> {
        if records.is_empty() {
            return vec![];
        }
        (0..count)
            .map(|_| records[self.rng.random_range(0..records.len())].clone())
            .collect()
    }
}

impl<R: Rng + Send> Sampler<R> {
    /// Draws `count` records and writes them to `writer`, returning the number sent.
    pub async fn send<T>(
        &mut self,
        records: &[T],
        count: usize,
        writer: &mut dyn DataWriter<T>,
    ) -> Result<usize>
    where
        T: Clone + Send + Sync + 'static,
    {
        let samples = self.draw(records, count);
        let sent = samples.len();
        for sample in samples {
            writer.write(sample).await?;
        }
        Ok(sent)
    }
}
