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

//! The sort operator of one worker.

use std::fmt::{Display, Formatter};
use std::time::Instant;

use log::{debug, info};

use super::{
    bucket_count, pad_splitters, sample_size, LocalAccumulator, LocalSorter, Redistributor,
    Sampler, SortMetrics, SplitterCoordinator, SplitterTree,
};
use crate::config::SortConfig;
use crate::error::{Result, SortError};
use crate::transport::{CollectiveChannel, DataChannel, DataWriter, WorkerContext};

type Callback<T> = Box<dyn FnMut(&T) + Send>;

/// Distributed sort operator for one worker.
///
/// Records are pushed in with [`SortOperator::accept`]. All workers then call
/// [`SortOperator::execute`] concurrently; it returns once this worker holds
/// its final partition. Afterwards every record on rank `i` is not greater
/// than any record on rank `i + 1`.
///
/// The operator uses two data channels, one for samples and splitters and one
/// for the redistribution, plus a collective channel for the size exchange.
/// Writers of both data channels are opened on construction.
pub struct SortOperator<T, C> {
    context: WorkerContext,
    config: SortConfig,
    less: C,
    accumulator: LocalAccumulator<T>,
    sample_channel: Box<dyn DataChannel<T>>,
    sample_writers: Vec<Box<dyn DataWriter<T>>>,
    data_channel: Box<dyn DataChannel<T>>,
    data_writers: Vec<Box<dyn DataWriter<T>>>,
    collective: Box<dyn CollectiveChannel>,
    callbacks: Vec<Callback<T>>,
    output: Vec<T>,
    executed: bool,
    metrics: SortMetrics,
}

impl<T, C> SortOperator<T, C>
where
    T: Clone + Send + Sync + 'static,
    C: Fn(&T, &T) -> bool + Send + Sync,
{
    /// Creates the operator. All three channels must have been built for
    /// `context.worker_count()` workers.
    pub fn try_new(
        context: WorkerContext,
        config: SortConfig,
        less: C,
        sample_channel: impl DataChannel<T> + 'static,
        data_channel: impl DataChannel<T> + 'static,
        collective: impl CollectiveChannel + 'static,
    ) -> Result<Self> {
        let mut sample_channel: Box<dyn DataChannel<T>> = Box::new(sample_channel);
        let mut data_channel: Box<dyn DataChannel<T>> = Box::new(data_channel);

        let worker_count = context.worker_count();
        for (name, count) in [
            ("sample channel", sample_channel.worker_count()),
            ("data channel", data_channel.worker_count()),
            ("collective channel", collective.worker_count()),
        ] {
            if count != worker_count {
                return Err(SortError::Configuration(format!(
                    "{name} connects {count} workers, expected {worker_count}"
                )));
            }
        }

        let sample_writers = sample_channel.open_writers()?;
        let data_writers = data_channel.open_writers()?;

        Ok(Self {
            context,
            config,
            less,
            accumulator: LocalAccumulator::new(),
            sample_channel,
            sample_writers,
            data_channel,
            data_writers,
            collective: Box::new(collective),
            callbacks: vec![],
            output: vec![],
            executed: false,
            metrics: SortMetrics::default(),
        })
    }

    /// Buffers one upstream record.
    pub fn accept(&mut self, record: T) {
        self.accumulator.accept(record);
    }

    /// Adds a downstream handler. Handlers run in registration order.
    pub fn register_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&T) + Send + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    /// Runs the sort. Must be called exactly once, on every worker.
    pub async fn execute(&mut self) -> Result<()> {
        if self.executed {
            return Err(SortError::Internal(format!(
                "{self} has already been executed"
            )));
        }
        self.executed = true;

        let started = Instant::now();
        let label = self.to_string();
        let rank = self.context.rank();
        let worker_count = self.context.worker_count();

        let local_records = self.accumulator.len() as u64;
        let prefix_records = self.collective.prefix_sum(local_records).await?;
        let total_records = self.collective.all_reduce_sum(local_records).await?;
        debug!("{label} holds {local_records} records, {prefix_records} before it, {total_records} in total");

        let sample_size = sample_size(total_records, self.config.desired_imbalance());
        let mut sampler = Sampler::for_worker(self.config.sample_seed(), rank);
        let samples_sent = sampler
            .send(
                self.accumulator.records(),
                sample_size,
                self.sample_writers[0].as_mut(),
            )
            .await?;
        self.sample_writers[0].close().await?;
        debug!("{label} sent {samples_sent} samples (sample size {sample_size})");

        let mut sample_reader = self.sample_channel.open_reader()?;
        let splitters = SplitterCoordinator::new(self.context, &self.less)
            .exchange(sample_reader.as_mut(), &mut self.sample_writers)
            .await?;
        drop(sample_reader);
        let splitter_count = splitters.len();

        // the tree only lives for the classification phase
        let sent_per_worker = {
            let splitters = pad_splitters(splitters, bucket_count(worker_count))?;
            let tree = SplitterTree::build(&splitters)?;
            let records = self.accumulator.take();
            Redistributor::try_new(
                &tree,
                &splitters,
                &self.less,
                worker_count,
                prefix_records,
                total_records,
            )?
            .run(records, &mut self.data_writers)
            .await?
        };
        for writer in self.data_writers.iter_mut() {
            writer.close().await?;
        }
        debug!("{label} sent {sent_per_worker:?} records to workers");

        let mut data_reader = self.data_channel.open_reader()?;
        let mut sorter = LocalSorter::default();
        let received = sorter.receive(data_reader.as_mut()).await?;
        info!("{label} received {received} records");
        sorter.sort(&self.less);
        self.output = sorter.into_records();

        self.metrics = SortMetrics {
            input_records: local_records,
            prefix_records,
            total_records,
            sample_size,
            samples_sent,
            splitter_count,
            sent_per_worker,
            output_records: self.output.len() as u64,
            elapsed: started.elapsed(),
        };
        info!("{label} finished: {}", self.metrics);
        Ok(())
    }

    /// Invokes every registered handler once per output record, in sorted
    /// order. Returns the number of records pushed.
    pub fn push_data(&mut self) -> usize {
        for record in &self.output {
            for callback in self.callbacks.iter_mut() {
                callback(record);
            }
        }
        self.output.len()
    }
}

impl<T, C> SortOperator<T, C> {
    /// Worker identity
    pub fn context(&self) -> WorkerContext {
        self.context
    }

    /// Final local partition, sorted. Empty before `execute`.
    pub fn output(&self) -> &[T] {
        &self.output
    }

    /// Takes the final local partition.
    pub fn into_output(self) -> Vec<T> {
        self.output
    }

    /// Counters of the last execution
    pub fn metrics(&self) -> &SortMetrics {
        &self.metrics
    }
}

impl<T, C> Display for SortOperator<T, C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[SortNode] job:{} rank:{}/{}",
            self.config.job_name().unwrap_or("unnamed"),
            self.context.rank(),
            self.context.worker_count()
        )
    }
}
