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

use std::sync::Arc;

use futures::future::try_join_all;
use log::{debug, info};
use parking_lot::Mutex;
use samplesort_core::config::SortConfig;
use samplesort_core::error::{Result, SortError};
use samplesort_core::transport::{LocalCollectiveGroup, MemoryChannelGroup};
use samplesort_core::{SortOperator, WorkerContext};

/// A cluster of sort workers, each running as its own tokio task and
/// connected through in-memory channels.
#[derive(Debug, Clone)]
pub struct LocalCluster {
    worker_count: usize,
    config: SortConfig,
}

impl LocalCluster {
    /// Creates a cluster of `worker_count` workers sharing `config`.
    pub fn new(worker_count: usize, config: SortConfig) -> Result<Self> {
        if worker_count == 0 {
            return Err(SortError::Configuration(
                "a local cluster needs at least one worker".to_string(),
            ));
        }
        Ok(Self {
            worker_count,
            config,
        })
    }

    /// Number of workers
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Operator configuration shared by all workers
    pub fn config(&self) -> &SortConfig {
        &self.config
    }

    /// Sorts the dataset whose partition for rank `i` is `inputs[i]`.
    ///
    /// Returns the final partitions in rank order; their concatenation is the
    /// input sorted by `less`.
    pub async fn sort_partitions<T, C>(
        &self,
        inputs: Vec<Vec<T>>,
        less: C,
    ) -> Result<Vec<Vec<T>>>
    where
        T: Clone + Send + Sync + 'static,
        C: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        if inputs.len() != self.worker_count {
            return Err(SortError::Configuration(format!(
                "got {} input partitions for {} workers",
                inputs.len(),
                self.worker_count
            )));
        }
        info!(
            "Starting local sort cluster of {} workers over {} records",
            self.worker_count,
            inputs.iter().map(Vec::len).sum::<usize>()
        );

        let block_size = self.config.block_size();
        let samples = MemoryChannelGroup::new(self.worker_count, block_size).into_endpoints();
        let data = MemoryChannelGroup::new(self.worker_count, block_size).into_endpoints();
        let collectives = LocalCollectiveGroup::new(self.worker_count).into_members();
        let less = Arc::new(less);

        let mut handles = Vec::with_capacity(self.worker_count);
        for (rank, (((sample, data), collective), input)) in samples
            .into_iter()
            .zip(data)
            .zip(collectives)
            .zip(inputs)
            .enumerate()
        {
            let less = less.clone();
            let mut operator = SortOperator::try_new(
                WorkerContext::try_new(rank, self.worker_count)?,
                self.config.clone(),
                move |a: &T, b: &T| less(a, b),
                sample,
                data,
                collective,
            )?;

            handles.push(tokio::spawn(async move {
                let collected = Arc::new(Mutex::new(Vec::new()));
                let sink = collected.clone();
                operator.register_callback(move |record: &T| sink.lock().push(record.clone()));

                for record in input {
                    operator.accept(record);
                }
                operator.execute().await?;
                let pushed = operator.push_data();
                debug!("{operator} pushed {pushed} records downstream");
                drop(operator);

                let records = match Arc::try_unwrap(collected) {
                    Ok(records) => records.into_inner(),
                    Err(shared) => std::mem::take(&mut *shared.lock()),
                };
                Ok::<_, SortError>(records)
            }));
        }

        let partitions = try_join_all(handles)
            .await?
            .into_iter()
            .collect::<Result<Vec<_>>>()?;
        info!(
            "Local sort cluster finished, partition sizes {:?}",
            partitions.iter().map(Vec::len).collect::<Vec<_>>()
        );
        Ok(partitions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use samplesort_core::config::SAMPLESORT_SAMPLE_SEED;

    #[test]
    fn test_rejects_empty_cluster() {
        assert!(matches!(
            LocalCluster::new(0, SortConfig::default()),
            Err(SortError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_wrong_partition_count() -> Result<()> {
        let cluster = LocalCluster::new(3, SortConfig::default())?;
        let result = cluster
            .sort_partitions(vec![vec![1u32], vec![2]], |a, b| a < b)
            .await;
        assert!(matches!(result, Err(SortError::Configuration(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_sorts_strings_descending() -> Result<()> {
        let config = SortConfig::default().with_setting(SAMPLESORT_SAMPLE_SEED, 3)?;
        let cluster = LocalCluster::new(2, config)?;
        let inputs = vec![
            vec!["pear".to_string(), "apple".to_string(), "fig".to_string()],
            vec!["kiwi".to_string(), "plum".to_string()],
        ];
        let partitions = cluster
            .sort_partitions(inputs, |a: &String, b: &String| a > b)
            .await?;
        let flat: Vec<String> = partitions.into_iter().flatten().collect();
        assert_eq!(flat, vec!["plum", "pear", "kiwi", "fig", "apple"]);
        Ok(())
    }
}
