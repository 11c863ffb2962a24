use thiserror::Error;

use crate::{bit::Bit, bus::MemoryBus};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PollError {
    #[error("status bit never came ready after {0} reads")]
    Exhausted(u32),
}

// Busy-wait on a status bit. The hardware idiom spins forever; an optional
// read budget makes the wait finite for hosts and deterministic for tests.
#[derive(Clone, Copy)]
pub struct Poller {
    budget: Option<u32>,
}

impl Poller {
    pub fn unbounded() -> Self {
        Self { budget: None }
    }

    pub fn with_budget(reads: u32) -> Self {
        Self { budget: Some(reads) }
    }

    // Spins reading `address` until `bit` comes up set.
    pub fn wait(&self, bus: &mut impl MemoryBus, address: u16, bit: usize) -> Result<(), PollError> {
        let mut reads = 0;
        loop {
            if bus.read_byte(address).bit(bit) {
                return Ok(());
            }
            reads += 1;
            if let Some(budget) = self.budget {
                if reads >= budget {
                    return Err(PollError::Exhausted(budget));
                }
            }
        }
    }
}
