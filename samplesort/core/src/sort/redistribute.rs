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

//! Classification of local records and the all-to-all exchange.

use super::{equivalent, SplitterTree};
use crate::error::{Result, SortError};
use crate::transport::DataWriter;

/// Sends every local record to the worker owning its bucket.
///
/// Records equivalent to a splitter would all land in the bucket right of
/// that splitter. To spread such runs, a record moves down one bucket at a
/// time while it is equivalent to the splitter below and its estimated
/// global rank lies below the lower boundary of the current bucket, that is
/// while `(prefix + index) * workers < bucket * total`.
pub struct Redistributor<'a, T, C> {
    tree: &'a SplitterTree<T>,
    /// Padded splitters the tree was built from
    splitters: &'a [T],
    less: &'a C,
    worker_count: usize,
    prefix: u64,
    total: u64,
}

impl<'a, T, C> Redistributor<'a, T, C>
where
    T: Send + Sync + 'static,
    C: Fn(&T, &T) -> bool + Sync,
{
    /// `prefix` is the number of records held by lower ranks and `total`
    /// the number of records on all workers.
    pub fn try_new(
        tree: &'a SplitterTree<T>,
        splitters: &'a [T],
        less: &'a C,
        worker_count: usize,
        prefix: u64,
        total: u64,
    ) -> Result<Self> {
        if splitters.len() + 1 != tree.buckets() {
            return Err(SortError::Internal(format!(
                "tree has {} buckets but {} splitters were given",
                tree.buckets(),
                splitters.len()
            )));
        }
        // without splitters every record goes to bucket 0, whatever the worker count
        let served = splitters.is_empty() || worker_count <= tree.buckets();
        if worker_count == 0 || !served {
            return Err(SortError::Internal(format!(
                "{worker_count} workers cannot be served by {} buckets",
                tree.buckets()
            )));
        }
        Ok(Self {
            tree,
            splitters,
            less,
            worker_count,
            prefix,
            total,
        })
    }

    /// Worker owning `bucket`. Padding buckets belong to the last worker.
    #[inline]
    pub fn worker_of(&self, bucket: usize) -> usize {
        bucket.min(self.worker_count - 1)
    }

    /// Applies the duplicate tie-break to a raw bucket. `index` is the
    /// record's position in the local buffer.
    #[inline]
    pub fn balance(&self, record: &T, index: usize, mut bucket: usize) -> usize {
        let rank = (self.prefix as u128 + index as u128) * self.worker_count as u128;
        while bucket > 0
            && equivalent(self.less, record, &self.splitters[bucket - 1])
            && rank < bucket as u128 * self.total as u128
        {
            bucket -= 1;
        }
        bucket
    }

    /// Bucket of the record at local position `index`.
    pub fn bucket_of(&self, record: &T, index: usize) -> usize {
        let raw = self.tree.classify(record, self.less);
        self.balance(record, index, raw)
    }

    /// Classifies and sends all records, two at a time. Returns the number of
    /// records sent to each worker. Writers are left open.
    pub async fn run(
        &self,
        records: Vec<T>,
        writers: &mut [Box<dyn DataWriter<T>>],
    ) -> Result<Vec<u64>> {
        if writers.len() != self.worker_count {
            return Err(SortError::Internal(format!(
                "expected {} data writers, got {}",
                self.worker_count,
                writers.len()
            )));
        }

        let mut sent = vec![0u64; self.worker_count];
        let mut records = records.into_iter().enumerate();
        loop {
            match (records.next(), records.next()) {
                (Some((i0, r0)), Some((i1, r1))) => {
                    let (b0, b1) = self.tree.classify_pair(&r0, &r1, self.less);
                    let w0 = self.worker_of(self.balance(&r0, i0, b0));
                    let w1 = self.worker_of(self.balance(&r1, i1, b1));
                    writers[w0].write(r0).await?;
                    sent[w0] += 1;
                    writers[w1].write(r1).await?;
                    sent[w1] += 1;
                }
                (Some((i, r)), None) => {
                    let w = self.worker_of(self.bucket_of(&r, i));
                    writers[w].write(r).await?;
                    sent[w] += 1;
                }
                _ => break,
            }
        }
        Ok(sent)
    }
}
