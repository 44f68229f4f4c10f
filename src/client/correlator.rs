// ABOUTME: Tracks in-flight submissions by sequence number and carrier message id
// ABOUTME: Resolves responses and receipts into status changes and wakes waiters

//! Submission correlation.
//!
//! Every entry moves `Pending -> Sent -> Delivered`, or to `Failed`. Only the
//! listener task resolves entries; senders block in
//! [`Correlator::await_completion`] on a watch channel and remove the entry
//! once they stop waiting.
//!
//! A multipart message has one sequence number per segment. It becomes
//! `Sent` once every segment has a successful response, and the message id
//! of the last segment is the one receipts are matched against.
//!
//! Receipts can overtake their submit_sm_resp. A receipt naming an unknown
//! carrier id is held for a grace period so the response can catch up.

use crate::client::error::{SmppError, SmppResult};
use crate::client::receipt::{DeliveryReceipt, DeliveryState};
use crate::client::types::{MessageStatus, SendOutcome};
use crate::datatypes::CommandStatus;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// What the waiting sender sees of its entry
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub status: MessageStatus,
    pub carrier_message_id: Option<String>,
    pub reason: Option<String>,
    /// Set when the session went away before the entry settled
    pub closed: bool,
}

/// Handed to the sender by [`Correlator::register`]
#[derive(Debug)]
pub struct PendingHandle {
    pub request_id: u64,
    segments: usize,
    receipt_requested: bool,
    cost: f64,
    progress: watch::Receiver<Progress>,
}

impl PendingHandle {
    pub fn segments(&self) -> usize {
        self.segments
    }

    /// Latest status without waiting
    pub fn status(&self) -> MessageStatus {
        self.progress.borrow().status
    }
}

/// A status change the billing collaborator should hear about
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub request_id: u64,
    pub carrier_message_id: String,
    pub status: MessageStatus,
    pub destination: String,
    /// Charged on `Sent`, zero otherwise
    pub cost: f64,
}

/// Parameters of one submission
#[derive(Debug, Clone)]
pub struct Registration {
    pub destination: String,
    /// One per segment, in part order
    pub sequence_numbers: Vec<u32>,
    pub receipt_requested: bool,
    pub cost: f64,
}

struct Entry {
    destination: String,
    cost: f64,
    outstanding: HashSet<u32>,
    /// Sequence number of the last segment, whose message id is authoritative
    final_sequence: u32,
    carrier_message_id: Option<String>,
    segment_ids: Vec<String>,
    status: MessageStatus,
    /// Receipt that arrived while segments were still unacknowledged
    early_receipt: Option<DeliveryReceipt>,
    progress: watch::Sender<Progress>,
}

impl Entry {
    fn publish(&self, reason: Option<String>) {
        self.progress.send_modify(|p| {
            p.status = self.status;
            p.carrier_message_id = self.carrier_message_id.clone();
            if reason.is_some() {
                p.reason = reason;
            }
        });
    }

    fn change(&self, request_id: u64, cost: f64) -> Option<StatusChange> {
        Some(StatusChange {
            request_id,
            carrier_message_id: self.carrier_message_id.clone()?,
            status: self.status,
            destination: self.destination.clone(),
            cost,
        })
    }
}

struct Orphan {
    receipt: DeliveryReceipt,
    deadline: Instant,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<u64, Entry>,
    by_sequence: HashMap<u32, u64>,
    by_carrier_id: HashMap<String, u64>,
    orphans: HashMap<String, Orphan>,
    closed: bool,
}

/// Registry of in-flight submissions
pub struct Correlator {
    inner: Mutex<Inner>,
    next_request_id: AtomicU64,
    receipt_grace: Duration,
}

impl Correlator {
    pub fn new(receipt_grace: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            next_request_id: AtomicU64::new(1),
            receipt_grace,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a submission before its PDUs go on the wire.
    pub fn register(&self, registration: Registration) -> SmppResult<PendingHandle> {
        let Registration {
            destination,
            sequence_numbers,
            receipt_requested,
            cost,
        } = registration;

        let Some(&final_sequence) = sequence_numbers.last() else {
            return Err(SmppError::InvalidState(
                "submission without segments".to_string(),
            ));
        };

        let mut inner = self.lock();
        if inner.closed {
            return Err(SmppError::SessionClosed);
        }

        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = watch::channel(Progress {
            status: MessageStatus::Pending,
            carrier_message_id: None,
            reason: None,
            closed: false,
        });

        for &sequence in &sequence_numbers {
            inner.by_sequence.insert(sequence, request_id);
        }
        inner.entries.insert(
            request_id,
            Entry {
                destination,
                cost,
                outstanding: sequence_numbers.iter().copied().collect(),
                final_sequence,
                carrier_message_id: None,
                segment_ids: Vec::new(),
                status: MessageStatus::Pending,
                early_receipt: None,
                progress: tx,
            },
        );
        debug!(request_id, segments = sequence_numbers.len(), "submission registered");

        Ok(PendingHandle {
            request_id,
            segments: sequence_numbers.len(),
            receipt_requested,
            cost,
            progress: rx,
        })
    }

    /// Apply a submit_sm_resp.
    ///
    /// Returns the status changes it caused: `Sent` once the last outstanding
    /// segment is acknowledged, possibly followed by the outcome of a receipt
    /// that was waiting for it. A response nobody is waiting for is dropped.
    pub fn resolve_submit(
        &self,
        sequence_number: u32,
        command_status: CommandStatus,
        message_id: &str,
    ) -> Vec<StatusChange> {
        if !command_status.is_ok() {
            self.resolve_failure(
                sequence_number,
                format!("submit_sm rejected: {command_status}"),
            );
            return Vec::new();
        }

        let mut inner = self.lock();
        let Some(request_id) = inner.by_sequence.remove(&sequence_number) else {
            debug!(sequence = sequence_number, "submit_sm_resp for unknown sequence");
            return Vec::new();
        };
        let carrier_id = message_id.trim_matches('\0').trim().to_string();
        if carrier_id.is_empty() {
            warn!(sequence = sequence_number, request_id, "submit_sm_resp without message id");
        }

        let Inner {
            entries,
            by_carrier_id,
            orphans,
            ..
        } = &mut *inner;
        let Some(entry) = entries.get_mut(&request_id) else {
            return Vec::new();
        };
        if entry.status != MessageStatus::Pending {
            return Vec::new();
        }

        entry.outstanding.remove(&sequence_number);
        if !carrier_id.is_empty() {
            by_carrier_id.insert(carrier_id.clone(), request_id);
            entry.segment_ids.push(carrier_id.clone());

            if let Some(orphan) = orphans.remove(&carrier_id) {
                if sequence_number == entry.final_sequence {
                    debug!(carrier_id = %carrier_id, "claiming receipt that arrived early");
                    entry.early_receipt = Some(orphan.receipt);
                } else {
                    debug!(carrier_id = %carrier_id, "receipt for non-final segment consumed");
                }
            }
        }
        if sequence_number == entry.final_sequence {
            entry.carrier_message_id = Some(carrier_id.clone());
        }

        if !entry.outstanding.is_empty() {
            entry.publish(None);
            return Vec::new();
        }

        entry.status = MessageStatus::Sent;
        entry.publish(None);
        info!(
            request_id,
            carrier_id = ?entry.carrier_message_id,
            "submission accepted by SMSC"
        );

        let mut changes: Vec<StatusChange> =
            entry.change(request_id, entry.cost).into_iter().collect();
        if let Some(receipt) = entry.early_receipt.take() {
            changes.extend(apply_receipt(request_id, entry, &receipt));
        }
        changes
    }

    /// Fail the submission that `sequence_number` belongs to, as on a
    /// generic_nack or a rejected submit_sm_resp. Returns whether an entry
    /// changed.
    pub fn resolve_failure(&self, sequence_number: u32, reason: String) -> bool {
        let mut inner = self.lock();
        let Some(request_id) = inner.by_sequence.remove(&sequence_number) else {
            return false;
        };
        let Some(entry) = inner.entries.get_mut(&request_id) else {
            return false;
        };
        if entry.status != MessageStatus::Pending {
            return false;
        }

        warn!(sequence = sequence_number, request_id, reason = %reason, "submission failed");
        entry.status = MessageStatus::Failed;
        entry.publish(Some(reason));
        true
    }

    /// Apply a delivery receipt, or hold it if its carrier id is not yet known.
    pub fn resolve_receipt(&self, receipt: DeliveryReceipt) -> Option<StatusChange> {
        let mut inner = self.lock();
        let Some(&request_id) = inner.by_carrier_id.get(&receipt.carrier_message_id) else {
            debug!(
                carrier_id = %receipt.carrier_message_id,
                state = %receipt.state,
                "holding receipt for unknown message id"
            );
            let deadline = Instant::now() + self.receipt_grace;
            inner.orphans.insert(
                receipt.carrier_message_id.clone(),
                Orphan { receipt, deadline },
            );
            return None;
        };

        let entry = inner.entries.get_mut(&request_id)?;
        if entry.carrier_message_id.as_deref() != Some(receipt.carrier_message_id.as_str()) {
            debug!(
                carrier_id = %receipt.carrier_message_id,
                request_id,
                "receipt for non-final segment consumed"
            );
            return None;
        }

        match entry.status {
            MessageStatus::Pending => {
                entry.early_receipt = Some(receipt);
                None
            }
            MessageStatus::Sent => apply_receipt(request_id, entry, &receipt),
            _ => None,
        }
    }

    /// Wait for the entry behind `handle` to settle, for at most `timeout`.
    ///
    /// Settled means `Delivered` or `Failed`, or `Sent` when no receipt was
    /// requested. A wait that times out after `Sent` is reported as an
    /// unconfirmed `Sent`; one that times out while still `Pending` is a
    /// `Timeout` error. The entry is removed either way.
    pub async fn await_completion(
        &self,
        mut handle: PendingHandle,
        timeout: Duration,
    ) -> SmppResult<SendOutcome> {
        let receipt_requested = handle.receipt_requested;
        let waited = tokio::time::timeout(
            timeout,
            handle
                .progress
                .wait_for(|p| p.closed || is_settled(p.status, receipt_requested)),
        )
        .await
        .map(|settled| settled.map(|progress| progress.clone()));

        let progress = match waited {
            Ok(Ok(progress)) => progress,
            Ok(Err(_)) => {
                self.remove(handle.request_id);
                return Err(SmppError::SessionClosed);
            }
            Err(_) => handle.progress.borrow().clone(),
        };
        self.remove(handle.request_id);

        let settled = is_settled(progress.status, receipt_requested);
        if progress.closed && !settled {
            return Err(SmppError::SessionClosed);
        }
        if progress.status == MessageStatus::Pending {
            return Err(SmppError::Timeout("submit_sm_resp"));
        }

        Ok(SendOutcome {
            request_id: handle.request_id,
            status: progress.status,
            carrier_message_id: progress.carrier_message_id,
            cost: handle.cost,
            segments: handle.segments,
            delivery_confirmed: receipt_requested && settled,
            reason: progress.reason,
        })
    }

    /// Forget an entry and every index pointing at it
    pub fn remove(&self, request_id: u64) {
        let mut inner = self.lock();
        let Some(entry) = inner.entries.remove(&request_id) else {
            return;
        };
        for sequence in &entry.outstanding {
            inner.by_sequence.remove(sequence);
        }
        for id in &entry.segment_ids {
            inner.by_carrier_id.remove(id);
        }
    }

    /// Drop held receipts whose grace period ended before `now`
    pub fn sweep_orphans(&self, now: Instant) -> usize {
        let mut inner = self.lock();
        let before = inner.orphans.len();
        inner.orphans.retain(|carrier_id, orphan| {
            let keep = orphan.deadline > now;
            if !keep {
                warn!(
                    carrier_id = %carrier_id,
                    state = %orphan.receipt.state,
                    "discarding receipt that matched no submission"
                );
            }
            keep
        });
        before - inner.orphans.len()
    }

    /// Wake every waiter with `closed` set and refuse further registrations
    pub fn close_all(&self) {
        let mut inner = self.lock();
        inner.closed = true;
        for entry in inner.entries.values() {
            entry.progress.send_modify(|p| p.closed = true);
        }
        inner.orphans.clear();
    }

    /// Number of entries still tracked
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn orphan_count(&self) -> usize {
        self.lock().orphans.len()
    }
}

fn is_settled(status: MessageStatus, receipt_requested: bool) -> bool {
    match status {
        MessageStatus::Pending => false,
        MessageStatus::Sent => !receipt_requested,
        MessageStatus::Delivered | MessageStatus::Failed => true,
    }
}

fn apply_receipt(
    request_id: u64,
    entry: &mut Entry,
    receipt: &DeliveryReceipt,
) -> Option<StatusChange> {
    let next = match receipt.state {
        DeliveryState::Delivered => MessageStatus::Delivered,
        state if state.is_failure() => MessageStatus::Failed,
        state => {
            debug!(request_id, state = %state, "non-final receipt");
            return None;
        }
    };

    entry.status = next;
    let reason = (next == MessageStatus::Failed).then(|| {
        format!(
            "delivery failed: {}{}",
            receipt.state,
            receipt
                .error_code
                .as_deref()
                .map(|e| format!(" (err {e})"))
                .unwrap_or_default()
        )
    });
    entry.publish(reason);
    info!(
        request_id,
        carrier_id = %receipt.carrier_message_id,
        status = %next,
        "delivery receipt applied"
    );

    // Failures are not billed
    if next == MessageStatus::Delivered {
        entry.change(request_id, 0.0)
    } else {
        None
    }
}
