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

#![doc = include_str!("../README.md")]

/// Local multi-worker cluster running inside one process.
pub mod cluster;
/// Command line configuration of the executor binary.
#[cfg(feature = "build-binary")]
pub mod config;
/// Synthetic input generators.
pub mod datagen;
/// Partition size statistics and output checks.
pub mod stats;

pub use cluster::LocalCluster;
pub use stats::PartitionStats;
