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

use rstest::rstest;
use samplesort_core::config::{SortConfig, SAMPLESORT_CHANNEL_BLOCK_SIZE, SAMPLESORT_SAMPLE_SEED};
use samplesort_core::error::Result;
use samplesort_executor::datagen::{generate, KeyDistribution, DUPLICATE_KEY};
use samplesort_executor::stats::is_globally_ordered;
use samplesort_executor::{LocalCluster, PartitionStats};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn cluster(workers: usize, seed: u64) -> Result<LocalCluster> {
    let config = SortConfig::default()
        .with_setting(SAMPLESORT_SAMPLE_SEED, seed)?
        .with_setting(SAMPLESORT_CHANNEL_BLOCK_SIZE, 64)?;
    LocalCluster::new(workers, config)
}

fn lt(a: &u64, b: &u64) -> bool {
    a < b
}

fn sorted_input(inputs: &[Vec<u64>]) -> Vec<u64> {
    let mut all: Vec<u64> = inputs.iter().flatten().copied().collect();
    all.sort_unstable();
    all
}

#[rstest]
#[case::one_worker(1)]
#[case::two_workers(2)]
#[case::three_workers(3)]
#[case::four_workers(4)]
#[case::five_workers(5)]
#[case::seven_workers(7)]
#[case::eight_workers(8)]
#[tokio::test]
async fn should_sort_uniform_keys(#[case] workers: usize) -> Result<()> {
    init();
    let inputs = generate(KeyDistribution::Uniform, 5_000, workers, 1);
    let expected = sorted_input(&inputs);

    let partitions = cluster(workers, 7)?.sort_partitions(inputs, lt).await?;

    assert_eq!(partitions.len(), workers);
    assert!(is_globally_ordered(&partitions, lt));
    let flat: Vec<u64> = partitions.into_iter().flatten().collect();
    assert_eq!(flat, expected);
    Ok(())
}

#[rstest]
#[case::two_workers(2)]
#[case::three_workers(3)]
#[case::four_workers(4)]
#[case::six_workers(6)]
#[tokio::test]
async fn should_spread_duplicate_keys(#[case] workers: usize) -> Result<()> {
    init();
    let records = 1200;
    let inputs = generate(KeyDistribution::Duplicates, records, workers, 0);

    let partitions = cluster(workers, 3)?.sort_partitions(inputs, lt).await?;

    // every record equals every splitter, so the split follows global ranks exactly
    let stats = PartitionStats::from_partitions(&partitions);
    assert_eq!(stats.total, records);
    assert_eq!(stats.counts, vec![records / workers; workers]);
    assert!(partitions.iter().flatten().all(|k| *k == DUPLICATE_KEY));
    Ok(())
}

#[tokio::test]
async fn should_order_shuffled_quartiles() -> Result<()> {
    init();
    // worker i holds quartile (i + 2) % 4 of [0, 400)
    let inputs: Vec<Vec<u64>> = (0..4u64)
        .map(|i| {
            let q = (i + 2) % 4;
            (q * 100..(q + 1) * 100).collect()
        })
        .collect();

    let partitions = cluster(4, 11)?.sort_partitions(inputs, lt).await?;

    let flat: Vec<u64> = partitions.iter().flatten().copied().collect();
    assert_eq!(flat, (0..400).collect::<Vec<_>>());
    for partition in &partitions {
        assert!(!partition.is_empty());
        assert!(partition.windows(2).all(|w| w[0] + 1 == w[1]));
    }
    Ok(())
}

#[tokio::test]
async fn should_keep_presorted_input_balanced() -> Result<()> {
    init();
    let workers = 4;
    let inputs = generate(KeyDistribution::Presorted, 20_000, workers, 5);

    let partitions = cluster(workers, 13)?.sort_partitions(inputs, lt).await?;

    assert!(is_globally_ordered(&partitions, lt));
    let stats = PartitionStats::from_partitions(&partitions);
    assert_eq!(stats.total, 20_000);
    // sampled splitters land close to the quartiles
    assert!(stats.imbalance < 1.5, "{stats}");
    Ok(())
}

#[tokio::test]
async fn should_handle_mixed_duplicates_and_empty_workers() -> Result<()> {
    init();
    let inputs = vec![
        vec![5, 5, 5, 1, 9, 5],
        vec![],
        vec![5, 5, 2, 5],
        vec![],
        vec![8, 5, 5],
    ];
    let expected = sorted_input(&inputs);

    let partitions = cluster(5, 21)?.sort_partitions(inputs, lt).await?;

    assert!(is_globally_ordered(&partitions, lt));
    let flat: Vec<u64> = partitions.into_iter().flatten().collect();
    assert_eq!(flat, expected);
    Ok(())
}

#[rstest]
#[case::nothing(vec![vec![], vec![], vec![]])]
#[case::single_record(vec![vec![], vec![17], vec![]])]
#[tokio::test]
async fn should_send_tiny_inputs_to_rank_zero(#[case] inputs: Vec<Vec<u64>>) -> Result<()> {
    init();
    let expected = sorted_input(&inputs);

    let partitions = cluster(3, 1)?.sort_partitions(inputs, lt).await?;

    assert_eq!(partitions[0], expected);
    assert!(partitions[1..].iter().all(Vec::is_empty));
    Ok(())
}

#[tokio::test]
async fn should_sort_without_fixed_seed() -> Result<()> {
    init();
    let inputs = generate(KeyDistribution::Uniform, 3_000, 3, 8);
    let expected = sorted_input(&inputs);

    let partitions = LocalCluster::new(3, SortConfig::default())?
        .sort_partitions(inputs, lt)
        .await?;

    let flat: Vec<u64> = partitions.into_iter().flatten().collect();
    assert_eq!(flat, expected);
    Ok(())
}
