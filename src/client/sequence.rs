// ABOUTME: Sequence number generator for outbound PDUs
// ABOUTME: Numbers run 1 to 0x7FFFFFFF and wrap back to 1

use std::sync::atomic::{AtomicU32, Ordering};

/// Largest sequence number SMPP allows; 0 and 0xFFFFFFFF are reserved
pub const MAX_SEQUENCE: u32 = 0x7FFF_FFFF;

/// Allocates sequence numbers 1..=0x7FFFFFFF, wrapping back to 1
#[derive(Debug)]
pub struct SequenceGenerator {
    last: AtomicU32,
}

impl Default for SequenceGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceGenerator {
    pub fn new() -> Self {
        Self::starting_after(0)
    }

    pub(crate) fn starting_after(last: u32) -> Self {
        Self {
            last: AtomicU32::new(last),
        }
    }

    pub fn next(&self) -> u32 {
        let previous = self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| Some(advance(last)))
            .unwrap_or_else(|last| last);
        advance(previous)
    }
}

fn advance(last: u32) -> u32 {
    if last >= MAX_SEQUENCE { 1 } else { last + 1 }
}
