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

//! Splitter selection on the coordinator and splitter broadcast.

use log::debug;

use super::ordering_of;
use crate::error::{Result, SortError};
use crate::transport::{DataReader, DataWriter, WorkerContext};

/// Sorts the merged sample and picks `worker_count - 1` evenly spaced splitters.
///
/// Splitter `i` is the first element of run `i` when the sorted sample is cut
/// into `worker_count` runs. Indices are clamped, so a sample smaller than
/// `worker_count` repeats elements; an empty sample yields no splitters.
pub fn select_splitters<T, C>(mut samples: Vec<T>, worker_count: usize, less: &C) -> Vec<T>
where
    T: Clone,
    C: Fn(&T, &T) -> bool,
{
    if samples.is_empty() || worker_count <= 1 {
        return vec![];
    }
    samples.sort_unstable_by(|a, b| ordering_of(less, a, b));

    let len = samples.len();
    (1..worker_count)
        .map(|i| samples[(i * len / worker_count).min(len - 1)].clone())
        .collect()
}

/// Pads `splitters` to `bucket_count - 1` entries by repeating the last one.
///
/// Buckets between two equal splitters never receive records, so padding
/// buckets stay empty. An empty splitter set stays empty.
pub fn pad_splitters<T: Clone>(mut splitters: Vec<T>, bucket_count: usize) -> Result<Vec<T>> {
    let target = bucket_count.saturating_sub(1);
    if splitters.len() > target {
        return Err(SortError::Internal(format!(
            "{} splitters do not fit into {bucket_count} buckets",
            splitters.len()
        )));
    }
    if let Some(last) = splitters.last().cloned() {
        splitters.resize(target, last);
    }
    Ok(splitters)
}

/// Agrees on one splitter set across all workers over the sample channel.
///
/// Every worker has already sent its samples to rank 0 and closed that
/// writer. Rank 0 drains all samples, selects splitters and sends them to
/// every other rank; the other ranks receive them.
pub struct SplitterCoordinator<'a, C> {
    context: WorkerContext,
    less: &'a C,
}

impl<'a, C> SplitterCoordinator<'a, C> {
    /// Creates the coordinator step for this worker.
    pub fn new(context: WorkerContext, less: &'a C) -> Self {
        Self { context, less }
    }

    /// Runs the exchange and returns the sorted splitters, either `0` or
    /// `worker_count - 1` of them. Closes all writers except the one to
    /// rank 0, which the caller closes after sending samples.
    pub async fn exchange<T>(
        &self,
        reader: &mut dyn DataReader<T>,
        writers: &mut [Box<dyn DataWriter<T>>],
    ) -> Result<Vec<T>>
    where
        T: Clone + Send + Sync + 'static,
        C: Fn(&T, &T) -> bool + Sync,
    {
        let worker_count = self.context.worker_count();
        if writers.len() != worker_count {
            return Err(SortError::Internal(format!(
                "expected {worker_count} sample writers, got {}",
                writers.len()
            )));
        }

        if self.context.is_coordinator() {
            let mut samples = vec![];
            while let Some(sample) = reader.next().await? {
                samples.push(sample);
            }
            let num_samples = samples.len();
            let splitters = select_splitters(samples, worker_count, self.less);
            debug!(
                "Selected {} splitters from {num_samples} samples",
                splitters.len()
            );

            for writer in writers.iter_mut().skip(1) {
                for splitter in &splitters {
                    writer.write(splitter.clone()).await?;
                }
                writer.close().await?;
            }
            Ok(splitters)
        } else {
            for writer in writers.iter_mut().skip(1) {
                writer.close().await?;
            }
            let mut splitters = vec![];
            while let Some(splitter) = reader.next().await? {
                splitters.push(splitter);
            }
            if !splitters.is_empty() && splitters.len() != worker_count - 1 {
                return Err(SortError::Internal(format!(
                    "rank {} received {} splitters for {worker_count} workers",
                    self.context.rank(),
                    splitters.len()
                )));
            }
            Ok(splitters)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{DataChannel, MemoryChannelGroup};

    #[test]
    fn test_select_evenly_spaced() {
        let samples: Vec<u32> = (0..100).rev().collect();
        let splitters = select_splitters(samples, 4, &|a: &u32, b: &u32| a < b);
        assert_eq!(splitters, vec![25, 50, 75]);
    }

    #[test]
    fn test_select_respects_predicate() {
        let samples: Vec<u32> = (0..100).collect();
        let splitters = select_splitters(samples, 4, &|a: &u32, b: &u32| a > b);
        assert_eq!(splitters, vec![74, 49, 24]);
    }

    #[test]
    fn test_uneven_sample_uses_proportional_index() {
        // 10 samples over 4 runs: indices 10/4, 20/4, 30/4
        let samples: Vec<u32> = (0..10).collect();
        let splitters = select_splitters(samples, 4, &|a: &u32, b: &u32| a < b);
        assert_eq!(splitters, vec![2, 5, 7]);
    }

    #[test]
    fn test_small_sample_is_clamped() {
        let less = |a: &u32, b: &u32| a < b;
        assert_eq!(select_splitters(vec![9, 3], 5, &less), vec![3, 3, 9, 9]);
        assert_eq!(select_splitters(vec![7], 3, &less), vec![7, 7]);
        assert!(select_splitters(Vec::<u32>::new(), 3, &less).is_empty());
        assert!(select_splitters(vec![1, 2, 3], 1, &less).is_empty());
    }

    #[test]
    fn test_pad_splitters() -> Result<()> {
        assert_eq!(pad_splitters(vec![10, 20], 4)?, vec![10, 20, 20]);
        assert_eq!(pad_splitters(vec![10, 20, 30], 4)?, vec![10, 20, 30]);
        assert_eq!(pad_splitters(vec![5, 6, 7, 8], 8)?, vec![5, 6, 7, 8, 8, 8, 8]);
        assert!(pad_splitters(Vec::<u32>::new(), 8)?.is_empty());
        assert!(pad_splitters(vec![1, 2, 3, 4], 4).is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_exchange_delivers_same_splitters_everywhere() -> Result<()> {
        let workers = 3;
        let endpoints = MemoryChannelGroup::<u32>::new(workers, 4).into_endpoints();
        let handles: Vec<_> = endpoints
            .into_iter()
            .enumerate()
            .map(|(rank, mut channel)| {
                tokio::spawn(async move {
                    let ctx = WorkerContext::try_new(rank, workers)?;
                    let mut writers = channel.open_writers()?;
                    let mut reader = channel.open_reader()?;
                    for i in 0..10 {
                        writers[0].write(rank as u32 * 10 + i).await?;
                    }
                    writers[0].close().await?;
                    let less = |a: &u32, b: &u32| a < b;
                    SplitterCoordinator::new(ctx, &less)
                        .exchange(reader.as_mut(), &mut writers)
                        .await
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await??, vec![10, 20]);
        }
        Ok(())
    }
}
