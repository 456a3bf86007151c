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

//! Samplesort local cluster binary.

use std::{env, io};

use anyhow::{bail, Result};
use clap::Parser;
use samplesort_core::config::LogRotationPolicy;
use samplesort_core::print_version;
use samplesort_executor::config::Config;
use samplesort_executor::stats::is_globally_ordered;
use samplesort_executor::{datagen, LocalCluster, PartitionStats};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // parse command-line arguments
    let opt = Config::parse();

    if opt.version {
        print_version();
        std::process::exit(0);
    }

    let rust_log = env::var(EnvFilter::DEFAULT_ENV);
    let log_filter = EnvFilter::new(rust_log.unwrap_or(opt.log_level_setting.clone()));

    let tracing = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_thread_names(opt.print_thread_info)
        .with_thread_ids(opt.print_thread_info)
        .with_writer(io::stdout)
        .with_env_filter(log_filter);

    // File layer
    if let Some(log_dir) = &opt.log_dir {
        let log_file_name_prefix = opt.log_file_name_prefix();
        let log_file = match opt.log_rotation_policy {
            LogRotationPolicy::Minutely => {
                tracing_appender::rolling::minutely(log_dir, &log_file_name_prefix)
            }
            LogRotationPolicy::Hourly => {
                tracing_appender::rolling::hourly(log_dir, &log_file_name_prefix)
            }
            LogRotationPolicy::Daily => {
                tracing_appender::rolling::daily(log_dir, &log_file_name_prefix)
            }
            LogRotationPolicy::Never => {
                tracing_appender::rolling::never(log_dir, &log_file_name_prefix)
            }
        };

        tracing.with_writer(log_file).init();
    } else {
        tracing.init();
    }

    let config = opt.sort_config()?;
    let cluster = LocalCluster::new(opt.workers, config)?;

    let inputs = datagen::generate(opt.distribution, opt.records, opt.workers, opt.seed);
    let mut expected: Vec<u64> = inputs.iter().flatten().copied().collect();
    expected.sort_unstable();
    info!(
        "Generated {} {} records over {} workers",
        expected.len(),
        opt.distribution,
        opt.workers
    );

    let partitions = cluster
        .sort_partitions(inputs, |a: &u64, b: &u64| a < b)
        .await?;

    if !is_globally_ordered(&partitions, |a: &u64, b: &u64| a < b) {
        bail!("partitions are not in global order");
    }
    if !partitions.iter().flatten().eq(expected.iter()) {
        bail!("sorted output does not contain exactly the input records");
    }

    let stats = PartitionStats::from_partitions(&partitions);
    info!("Sort verified: {stats}");
    info!("Partition sizes: {:?}", stats.counts);
    Ok(())
}
