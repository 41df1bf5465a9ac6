// crates/seig-economics/src/deposit.rs
//
// Withdrawal requests and the per-(chain, staker) request queue.
//
// Requests are append-only; a request's index is its id and is never reused.
// Requests leave the pending state strictly in index order (processed or
// cancelled), so the pending requests always form a suffix of the queue
// starting at `next_index`.

use serde::{Deserialize, Serialize};

use seig_core::{amount_str, Amount, Tick};

use crate::fixed::checked_add;

/// Lifecycle of a withdrawal request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Processed,
    Cancelled,
}

/// A withdrawal of `amount` effective units requested at `requested_at`.
///
/// The amount was burned from the chain ledger when the request was made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    #[serde(with = "amount_str")]
    pub amount: Amount,
    pub requested_at: Tick,
    pub status: RequestStatus,
}

impl WithdrawalRequest {
    /// True once the request has left the pending state.
    pub fn processed(&self) -> bool {
        self.status != RequestStatus::Pending
    }

    /// First tick at which the request may be processed.
    pub fn ready_at(&self, delay: Tick) -> Tick {
        self.requested_at.saturating_add(delay)
    }

    pub fn is_ready(&self, now: Tick, delay: Tick) -> bool {
        now.saturating_sub(self.requested_at) >= delay
    }
}

/// Ready requests found at the head of a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadyBatch {
    pub count: usize,
    pub total: Amount,
}

/// Request queue for one staker on one chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestQueue {
    requests: Vec<WithdrawalRequest>,
    next_index: usize,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pending request. Returns its index.
    pub fn push(&mut self, amount: Amount, now: Tick) -> usize {
        self.requests.push(WithdrawalRequest {
            amount,
            requested_at: now,
            status: RequestStatus::Pending,
        });
        self.requests.len() - 1
    }

    pub fn num_requests(&self) -> usize {
        self.requests.len()
    }

    pub fn num_pending(&self) -> usize {
        self.requests.len() - self.next_index
    }

    /// Index of the oldest pending request.
    pub fn next_index(&self) -> usize {
        self.next_index
    }

    pub fn get(&self, index: usize) -> Option<&WithdrawalRequest> {
        self.requests.get(index)
    }

    pub fn requests(&self) -> &[WithdrawalRequest] {
        &self.requests
    }

    /// Oldest pending request.
    pub fn oldest_pending(&self) -> Option<&WithdrawalRequest> {
        self.requests.get(self.next_index)
    }

    /// Sum of pending amounts.
    pub fn pending_amount(&self) -> Amount {
        self.requests[self.next_index..]
            .iter()
            .fold(0u128, |acc, r| acc.saturating_add(r.amount))
    }

    /// Consecutive ready requests from the head, stopping at the first unready one.
    pub fn ready_batch(&self, now: Tick, delay: Tick) -> Result<ReadyBatch, seig_core::ArithmeticError> {
        let mut batch = ReadyBatch { count: 0, total: 0 };
        for request in &self.requests[self.next_index..] {
            if !request.is_ready(now, delay) {
                break;
            }
            batch.total = checked_add(batch.total, request.amount, "process_request")?;
            batch.count += 1;
        }
        Ok(batch)
    }

    /// Mark the first `count` pending requests processed.
    pub fn mark_processed(&mut self, count: usize) {
        let end = (self.next_index + count).min(self.requests.len());
        for request in &mut self.requests[self.next_index..end] {
            request.status = RequestStatus::Processed;
        }
        self.next_index = end;
    }

    /// Cancel the oldest pending request. Returns its index and amount.
    pub fn cancel_oldest(&mut self) -> Option<(usize, Amount)> {
        let index = self.next_index;
        let request = self.requests.get_mut(index)?;
        request.status = RequestStatus::Cancelled;
        self.next_index += 1;
        Some((index, request.amount))
    }
}
