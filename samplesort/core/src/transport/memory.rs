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

//! In-process all-to-all data channel.
//!
//! Records are batched into blocks on the sending side and moved through one
//! unbounded queue per destination worker. The queue closes once the senders
//! of all writers addressed to it have been dropped.

use async_trait::async_trait;
use log::warn;
use tokio::sync::mpsc;

use super::{DataChannel, DataReader, DataWriter};
use crate::error::{Result, SortError};

type Block<T> = Vec<T>;

/// Builds the per-worker endpoints of one in-memory data channel.
pub struct MemoryChannelGroup<T> {
    endpoints: Vec<MemoryDataChannel<T>>,
}

impl<T: Send + 'static> MemoryChannelGroup<T> {
    /// Creates a channel connecting `worker_count` workers. Writers hand
    /// records to the queue in blocks of `block_size`.
    pub fn new(worker_count: usize, block_size: usize) -> Self {
        let block_size = block_size.max(1);
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..worker_count)
            .map(|_| mpsc::unbounded_channel::<Block<T>>())
            .unzip();

        let endpoints = receivers
            .into_iter()
            .enumerate()
            .map(|(rank, receiver)| MemoryDataChannel {
                rank,
                worker_count,
                block_size,
                senders: Some(senders.clone()),
                receiver: Some(receiver),
            })
            .collect();

        // `senders` is dropped here, so only the endpoints keep the queues open
        Self { endpoints }
    }

    /// Endpoints ordered by rank.
    pub fn into_endpoints(self) -> Vec<MemoryDataChannel<T>> {
        self.endpoints
    }
}

/// One worker's endpoint of a [`MemoryChannelGroup`].
pub struct MemoryDataChannel<T> {
    rank: usize,
    worker_count: usize,
    block_size: usize,
    senders: Option<Vec<mpsc::UnboundedSender<Block<T>>>>,
    receiver: Option<mpsc::UnboundedReceiver<Block<T>>>,
}

impl<T> MemoryDataChannel<T> {
    /// Rank owning this endpoint
    pub fn rank(&self) -> usize {
        self.rank
    }
}

impl<T: Send + 'static> DataChannel<T> for MemoryDataChannel<T> {
    fn worker_count(&self) -> usize {
        self.worker_count
    }

    fn open_writers(&mut self) -> Result<Vec<Box<dyn DataWriter<T>>>> {
        let senders = self.senders.take().ok_or_else(|| {
            SortError::Internal(format!(
                "writers of rank {} have already been opened",
                self.rank
            ))
        })?;
        Ok(senders
            .into_iter()
            .enumerate()
            .map(|(target, sender)| {
                Box::new(MemoryWriter {
                    target,
                    block_size: self.block_size,
                    buffer: Vec::with_capacity(self.block_size),
                    sender: Some(sender),
                }) as Box<dyn DataWriter<T>>
            })
            .collect())
    }

    fn open_reader(&mut self) -> Result<Box<dyn DataReader<T>>> {
        let receiver = self.receiver.take().ok_or_else(|| {
            SortError::Internal(format!(
                "reader of rank {} has already been opened",
                self.rank
            ))
        })?;
        Ok(Box::new(MemoryReader {
            receiver,
            current: Vec::new().into_iter(),
        }))
    }
}

struct MemoryWriter<T> {
    target: usize,
    block_size: usize,
    buffer: Block<T>,
    sender: Option<mpsc::UnboundedSender<Block<T>>>,
}

impl<T> MemoryWriter<T> {
    fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let sender = self.sender.as_ref().ok_or_else(|| {
            SortError::ChannelClosed(format!("writer to rank {}", self.target))
        })?;
        let block = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.block_size));
        sender.send(block).map_err(|_| {
            SortError::ChannelClosed(format!(
                "reader of rank {} has gone away",
                self.target
            ))
        })
    }
}

#[async_trait]
impl<T: Send + 'static> DataWriter<T> for MemoryWriter<T> {
    async fn write(&mut self, record: T) -> Result<()> {
        if self.sender.is_none() {
            return Err(SortError::ChannelClosed(format!(
                "write to closed writer for rank {}",
                self.target
            )));
        }
        self.buffer.push(record);
        if self.buffer.len() >= self.block_size {
            self.flush()?;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.sender.is_none() {
            return Ok(());
        }
        let flushed = self.flush();
        self.sender = None;
        flushed
    }
}

impl<T> Drop for MemoryWriter<T> {
    fn drop(&mut self) {
        if self.sender.is_some() && !self.buffer.is_empty() {
            warn!(
                "Writer to rank {} dropped without close, flushing {} records",
                self.target,
                self.buffer.len()
            );
            let _ = self.flush();
        }
    }
}

struct MemoryReader<T> {
    receiver: mpsc::UnboundedReceiver<Block<T>>,
    current: std::vec::IntoIter<T>,
}

#[async_trait]
impl<T: Send + 'static> DataReader<T> for MemoryReader<T> {
    async fn next(&mut self) -> Result<Option<T>> {
        loop {
            if let Some(record) = self.current.next() {
                return Ok(Some(record));
            }
            match self.receiver.recv().await {
                Some(block) => self.current = block.into_iter(),
                None => return Ok(None),
            }
        }
    }
}
