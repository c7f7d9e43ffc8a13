//! Voting-power checkpoints.
//!
//! Every account's history is a list of indices into one shared arena of
//! `Checkpoint` records. Blocks within one history are strictly increasing;
//! a second write in the same block overwrites the last record instead of
//! appending. Records are never removed.

use devoter_types::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Voting power in effect from `block` until the next checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub block: u64,
    pub votes: U256,
}

/// Arena of checkpoint records with a per-account index.
#[derive(Debug, Clone, Default)]
pub struct CheckpointArena {
    records: Vec<Checkpoint>,
    histories: HashMap<Address, Vec<usize>>,
}

impl CheckpointArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `votes` for `account` at `block`.
    ///
    /// `block` must not be lower than the account's last checkpoint; the
    /// ledger clock guarantees this.
    pub fn push(&mut self, account: Address, block: u64, votes: U256) {
        let history = self.histories.entry(account).or_default();

        if let Some(&last) = history.last() {
            let record = &mut self.records[last];
            debug_assert!(record.block <= block, "checkpoint written out of order");
            if record.block == block {
                record.votes = votes;
                return;
            }
        }

        history.push(self.records.len());
        self.records.push(Checkpoint { block, votes });
    }

    /// Latest voting power, zero when there is no history.
    pub fn latest(&self, account: &Address) -> U256 {
        self.histories
            .get(account)
            .and_then(|h| h.last())
            .map(|&i| self.records[i].votes)
            .unwrap_or(U256::ZERO)
    }

    /// Voting power of the last checkpoint with `block <= target`.
    pub fn upper_lookup(&self, account: &Address, target: u64) -> U256 {
        let Some(history) = self.histories.get(account) else {
            return U256::ZERO;
        };

        let pos = history.partition_point(|&i| self.records[i].block <= target);
        if pos == 0 {
            U256::ZERO
        } else {
            self.records[history[pos - 1]].votes
        }
    }

    pub fn len(&self, account: &Address) -> usize {
        self.histories.get(account).map_or(0, Vec::len)
    }

    pub fn at(&self, account: &Address, pos: usize) -> Option<Checkpoint> {
        self.histories
            .get(account)
            .and_then(|h| h.get(pos))
            .map(|&i| self.records[i])
    }

    /// Accounts that have at least one checkpoint.
    pub fn accounts(&self) -> impl Iterator<Item = &Address> {
        self.histories.keys()
    }

    /// Total number of records across all accounts.
    pub fn total_records(&self) -> usize {
        self.records.len()
    }
}

/// Total-supply history, one checkpoint per block in which supply changed.
#[derive(Debug, Clone, Default)]
pub struct SupplyHistory {
    checkpoints: Vec<Checkpoint>,
}

impl SupplyHistory {
    pub fn push(&mut self, block: u64, supply: U256) {
        if let Some(last) = self.checkpoints.last_mut() {
            if last.block == block {
                last.votes = supply;
                return;
            }
        }
        self.checkpoints.push(Checkpoint { block, votes: supply });
    }

    pub fn upper_lookup(&self, target: u64) -> U256 {
        let pos = self.checkpoints.partition_point(|c| c.block <= target);
        if pos == 0 {
            U256::ZERO
        } else {
            self.checkpoints[pos - 1].votes
        }
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }
}
