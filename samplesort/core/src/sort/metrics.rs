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
use std::time::Duration;

/// Counters collected by one execution of the sort operator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortMetrics {
    /// Records accepted from upstream
    pub input_records: u64,
    /// Records held by lower ranks
    pub prefix_records: u64,
    /// Records held by all workers
    pub total_records: u64,
    /// Samples each worker was asked to draw
    pub sample_size: usize,
    /// Samples this worker actually sent
    pub samples_sent: usize,
    /// Splitters agreed on, before padding
    pub splitter_count: usize,
    /// Records sent to each worker during redistribution
    pub sent_per_worker: Vec<u64>,
    /// Records in the final local partition
    pub output_records: u64,
    /// Wall time of `execute`
    pub elapsed: Duration,
}

impl Display for SortMetrics {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "input={} prefix={} total={} sample_size={} samples_sent={} splitters={} output={} elapsed={:?}",
            self.input_records,
            self.prefix_records,
            self.total_records,
            self.sample_size,
            self.samples_sent,
            self.splitter_count,
            self.output_records,
            self.elapsed
        )
    }
}
