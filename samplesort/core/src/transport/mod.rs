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

//! Communication primitives the sort operator is built on.
//!
//! A [`DataChannel`] connects every worker to every other worker: each worker
//! opens one writer per destination rank and a single reader that yields what
//! all writers addressed to it have sent. A reader reports end-of-stream only
//! after every writer on the channel has been closed.
//!
//! A [`CollectiveChannel`] provides the rank-ordered prefix sum and the global
//! sum used for the size exchange.

use async_trait::async_trait;

use crate::error::{Result, SortError};

mod collective;
mod memory;

pub use collective::{LocalCollective, LocalCollectiveGroup};
pub use memory::{MemoryChannelGroup, MemoryDataChannel};

/// Identity of one worker within the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkerContext {
    rank: usize,
    worker_count: usize,
}

impl WorkerContext {
    /// Creates a context for worker `rank` out of `worker_count`.
    pub fn try_new(rank: usize, worker_count: usize) -> Result<Self> {
        if worker_count == 0 {
            return Err(SortError::Configuration(
                "worker count must be at least 1".to_string(),
            ));
        }
        if rank >= worker_count {
            return Err(SortError::Configuration(format!(
                "rank {rank} is out of range for {worker_count} workers"
            )));
        }
        Ok(Self { rank, worker_count })
    }

    /// 0-based rank of this worker
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Number of workers in the job
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Whether this worker collects samples and selects splitters
    pub fn is_coordinator(&self) -> bool {
        self.rank == 0
    }
}

/// Sending side of a data channel towards a single destination worker.
#[async_trait]
pub trait DataWriter<T: Send + 'static>: Send {
    /// Queues a record for the destination.
    async fn write(&mut self, record: T) -> Result<()>;

    /// Flushes pending records and signals end-of-stream. Closing twice is a no-op.
    async fn close(&mut self) -> Result<()>;
}

/// Receiving side of a data channel.
#[async_trait]
pub trait DataReader<T: Send + 'static>: Send {
    /// Waits for the next record. `Ok(None)` means every writer has closed
    /// and all buffered records have been consumed.
    async fn next(&mut self) -> Result<Option<T>>;
}

/// One worker's endpoint of an all-to-all data channel.
pub trait DataChannel<T: Send + 'static>: Send {
    /// Number of workers this channel was built for
    fn worker_count(&self) -> usize;

    /// Opens one writer per destination, indexed by rank. May be called once.
    fn open_writers(&mut self) -> Result<Vec<Box<dyn DataWriter<T>>>>;

    /// Opens the reader for this worker. May be called once.
    fn open_reader(&mut self) -> Result<Box<dyn DataReader<T>>>;
}

/// Collective operations over all workers of the job.
#[async_trait]
pub trait CollectiveChannel: Send + Sync {
    /// Number of workers taking part
    fn worker_count(&self) -> usize;

    /// Exclusive prefix sum of `local` ordered by rank.
    async fn prefix_sum(&self, local: u64) -> Result<u64>;

    /// Sum of `local` over all ranks, identical on every worker.
    async fn all_reduce_sum(&self, local: u64) -> Result<u64>;
}
