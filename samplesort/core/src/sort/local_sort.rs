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

use super::ordering_of;
use crate::error::Result;
use crate::transport::DataReader;

/// Collects the records redistributed to this worker and sorts them.
#[derive(Debug)]
pub struct LocalSorter<T> {
    records: Vec<T>,
}

impl<T> Default for LocalSorter<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

impl<T: Send + 'static> LocalSorter<T> {
    /// Drains `reader` until every writer has closed. Returns the number of
    /// records received.
    pub async fn receive(&mut self, reader: &mut dyn DataReader<T>) -> Result<usize> {
        let before = self.records.len();
        while let Some(record) = reader.next().await? {
            self.records.push(record);
        }
        Ok(self.records.len() - before)
    }
}

impl<T> LocalSorter<T> {
    /// Sorts the received records. Equivalent records keep no particular order.
    pub fn sort<C>(&mut self, less: &C)
    where
        C: Fn(&T, &T) -> bool,
    {
        self.records.sort_unstable_by(|a, b| ordering_of(less, a, b));
    }

    /// Received records
    pub fn records(&self) -> &[T] {
        &self.records
    }

    /// Hands over the received records.
    pub fn into_records(self) -> Vec<T> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{DataChannel, MemoryChannelGroup};

    #[tokio::test]
    async fn test_receive_and_sort() -> Result<()> {
        let mut endpoints = MemoryChannelGroup::<(u32, u32)>::new(2, 3).into_endpoints();
        let mut reader = endpoints[1].open_reader()?;
        for (rank, endpoint) in endpoints.iter_mut().enumerate() {
            let mut writers = endpoint.open_writers()?;
            for v in [5, 1, 4] {
                writers[1].write((v, rank as u32)).await?;
            }
            for w in writers.iter_mut() {
                w.close().await?;
            }
        }

        let mut sorter = LocalSorter::default();
        assert_eq!(sorter.receive(reader.as_mut()).await?, 6);

        let by_key = |a: &(u32, u32), b: &(u32, u32)| a.0 < b.0;
        sorter.sort(&by_key);
        let keys: Vec<u32> = sorter.records().iter().map(|r| r.0).collect();
        assert_eq!(keys, vec![1, 1, 4, 4, 5, 5]);
        assert_eq!(sorter.into_records().len(), 6);
        Ok(())
    }
}
