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

//! Local input buffer of the sort operator.

/// Buffers every record pushed into the operator until classification.
#[derive(Debug)]
pub struct LocalAccumulator<T> {
    records: Vec<T>,
}

impl<T> Default for LocalAccumulator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LocalAccumulator<T> {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Appends a record.
    pub fn accept(&mut self, record: T) {
        self.records.push(record);
    }

    /// Number of buffered records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if nothing has been accepted yet (or the buffer was taken).
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Buffered records in arrival order
    pub fn records(&self) -> &[T] {
        &self.records
    }

    /// Hands the buffered records over, leaving the accumulator empty.
    pub fn take(&mut self) -> Vec<T> {
        std::mem::take(&mut self.records)
    }
}

impl<T> Extend<T> for LocalAccumulator<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.records.extend(iter)
    }
}
