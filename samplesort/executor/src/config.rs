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

use std::collections::HashMap;

use samplesort_core::config::{
    LogRotationPolicy, SortConfig, SAMPLESORT_CHANNEL_BLOCK_SIZE, SAMPLESORT_DESIRED_IMBALANCE,
    SAMPLESORT_JOB_NAME, SAMPLESORT_SAMPLE_SEED,
};
use samplesort_core::error::Result;

use crate::datagen::KeyDistribution;

/// Configuration of the application
#[derive(clap::Parser, Debug)]
#[command(about, long_about = None)]
pub struct Config {
    #[arg(long, help = "Print version and exit")]
    pub version: bool,
    #[arg(short = 'w', long, default_value_t = 4, help = "Number of workers. Default: 4")]
    pub workers: usize,
    #[arg(
        short = 'n',
        long,
        default_value_t = 1_000_000,
        help = "Number of records to generate. Default: 1000000"
    )]
    pub records: usize,
    #[arg(
        short = 'd',
        long,
        default_value_t = KeyDistribution::Uniform,
        help = "Key distribution of the generated records, possible values: uniform, duplicates, presorted. Default: uniform"
    )]
    pub distribution: KeyDistribution,
    #[arg(long, default_value_t = 0, help = "Seed of the data generator. Default: 0")]
    pub seed: u64,
    #[arg(
        long,
        help = "Seed of the samplers. When absent every worker seeds from the OS"
    )]
    pub sample_seed: Option<u64>,
    #[arg(
        long,
        default_value_t = 0.25,
        help = "Desired imbalance of the partitions, in (0, 1]. Default: 0.25"
    )]
    pub desired_imbalance: f64,
    #[arg(
        long,
        default_value_t = 1024,
        help = "Records per block on the in-memory channels. Default: 1024"
    )]
    pub block_size: u64,
    #[arg(long, default_value_t = String::from("samplesort"), help = "Job name shown in log lines")]
    pub job_name: String,
    #[arg(
        long,
        help = "Log dir: a path to save log. This will create a new storage directory at the specified path if it does not already exist."
    )]
    pub log_dir: Option<String>,
    #[arg(
        long,
        default_value_t = false,
        help = "Enable print thread ids and names in log file."
    )]
    pub print_thread_info: bool,
    #[arg(
        long,
        default_value_t = String::from("INFO"),
        help = "special log level for sub mod. link: https://docs.rs/env_logger/latest/env_logger/#enabling-logging. For example INFO,samplesort_core=DEBUG"
    )]
    pub log_level_setting: String,
    #[arg(
        long,
        default_value_t = LogRotationPolicy::Daily,
        help = "Tracing log rotation policy, possible values: minutely, hourly, daily, never. Default: daily"
    )]
    pub log_rotation_policy: LogRotationPolicy,
}

impl Config {
    /// Operator settings derived from the command line.
    pub fn sort_config(&self) -> Result<SortConfig> {
        let mut settings = HashMap::from([
            (SAMPLESORT_JOB_NAME.to_string(), self.job_name.clone()),
            (
                SAMPLESORT_DESIRED_IMBALANCE.to_string(),
                self.desired_imbalance.to_string(),
            ),
            (
                SAMPLESORT_CHANNEL_BLOCK_SIZE.to_string(),
                self.block_size.to_string(),
            ),
        ]);
        if let Some(seed) = self.sample_seed {
            settings.insert(SAMPLESORT_SAMPLE_SEED.to_string(), seed.to_string());
        }
        SortConfig::with_settings(settings)
    }

    /// Prefix of rolled log files
    pub fn log_file_name_prefix(&self) -> String {
        format!("samplesort_{}_{}", self.job_name, self.workers)
    }
}
