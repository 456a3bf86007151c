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

//! In-process collective operations.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use super::CollectiveChannel;
use crate::error::{Result, SortError};

struct RoundState {
    /// Completed rounds
    generation: u64,
    arrived: usize,
    pending: Vec<u64>,
    /// Values of the last completed round
    published: Vec<u64>,
    /// Set when a participant is dropped
    departed: Option<usize>,
}

struct Shared {
    state: Mutex<RoundState>,
    notify: Notify,
}

/// Builds the per-worker handles of one in-process collective group.
pub struct LocalCollectiveGroup {
    members: Vec<LocalCollective>,
}

impl LocalCollectiveGroup {
    /// Creates a group of `worker_count` participants.
    pub fn new(worker_count: usize) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(RoundState {
                generation: 0,
                arrived: 0,
                pending: vec![0; worker_count],
                published: vec![],
                departed: None,
            }),
            notify: Notify::new(),
        });
        let members = (0..worker_count)
            .map(|rank| LocalCollective {
                rank,
                worker_count,
                shared: shared.clone(),
            })
            .collect();
        Self { members }
    }

    /// Participants ordered by rank.
    pub fn into_members(self) -> Vec<LocalCollective> {
        self.members
    }
}

/// One worker's handle of a [`LocalCollectiveGroup`].
///
/// Every round waits until all participants have contributed their value.
/// Dropping a handle fails rounds that can no longer complete.
pub struct LocalCollective {
    rank: usize,
    worker_count: usize,
    shared: Arc<Shared>,
}

impl LocalCollective {
    /// Contributes `local` and returns the values of all ranks.
    async fn exchange(&self, local: u64) -> Result<Vec<u64>> {
        let round = {
            let mut state = self.shared.state.lock();
            if let Some(rank) = state.departed {
                return Err(SortError::Collective(format!(
                    "rank {rank} left the collective group"
                )));
            }
            state.pending[self.rank] = local;
            state.arrived += 1;
            if state.arrived == self.worker_count {
                let values = std::mem::replace(
                    &mut state.pending,
                    vec![0; self.worker_count],
                );
                state.published = values;
                state.arrived = 0;
                state.generation += 1;
                self.shared.notify.notify_waiters();
                return Ok(state.published.clone());
            }
            state.generation
        };

        loop {
            let notified = self.shared.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let state = self.shared.state.lock();
                if state.generation > round {
                    return Ok(state.published.clone());
                }
                if let Some(rank) = state.departed {
                    return Err(SortError::Collective(format!(
                        "rank {rank} left the collective group"
                    )));
                }
            }
            notified.await;
        }
    }
}

#[async_trait]
impl CollectiveChannel for LocalCollective {
    fn worker_count(&self) -> usize {
        self.worker_count
    }

    async fn prefix_sum(&self, local: u64) -> Result<u64> {
        let values = self.exchange(local).await?;
        Ok(values[..self.rank].iter().sum())
    }

    async fn all_reduce_sum(&self, local: u64) -> Result<u64> {
        let values = self.exchange(local).await?;
        Ok(values.iter().sum())
    }
}

impl Drop for LocalCollective {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock();
        state.departed.get_or_insert(self.rank);
        self.shared.notify.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn prefix_and_total_across_rounds() -> Result<()> {
        let members = LocalCollectiveGroup::new(4).into_members();
        let handles: Vec<_> = members
            .into_iter()
            .enumerate()
            .map(|(rank, member)| {
                tokio::spawn(async move {
                    let local = (rank as u64 + 1) * 10;
                    let prefix = member.prefix_sum(local).await?;
                    let total = member.all_reduce_sum(local).await?;
                    let again = member.all_reduce_sum(1).await?;
                    Ok::<_, SortError>((prefix, total, again))
                })
            })
            .collect();

        let mut results = vec![];
        for handle in handles {
            results.push(handle.await??);
        }
        assert_eq!(
            results,
            vec![(0, 100, 4), (10, 100, 4), (30, 100, 4), (60, 100, 4)]
        );
        Ok(())
    }

    #[tokio::test]
    async fn single_member_completes_immediately() -> Result<()> {
        let member = LocalCollectiveGroup::new(1).into_members().remove(0);
        assert_eq!(member.prefix_sum(7).await?, 0);
        assert_eq!(member.all_reduce_sum(7).await?, 7);
        Ok(())
    }

    #[tokio::test]
    async fn dropped_member_fails_waiting_round() {
        let mut members = LocalCollectiveGroup::new(2).into_members();
        let survivor = members.remove(0);
        let waiting = tokio::spawn(async move { survivor.all_reduce_sum(1).await });
        tokio::task::yield_now().await;
        drop(members);
        assert!(matches!(
            waiting.await.unwrap(),
            Err(SortError::Collective(_))
        ));
    }
}
