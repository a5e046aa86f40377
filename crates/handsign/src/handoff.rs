//! Single-slot handoff between threads.
//!
//! A slot holds at most one value. Publishing into a full slot replaces the pending value, so the
//! reader always sees the most recent value and the writer never blocks on a slow reader.

use crossbeam::channel::{self, Receiver, Sender, TrySendError};

/// Creates a connected [`SlotWriter`] and [`SlotReader`].
pub fn slot<T>() -> (SlotWriter<T>, SlotReader<T>) {
    let (sender, recv) = channel::bounded(1);
    (
        SlotWriter {
            sender,
            drain: recv.clone(),
            replaced: 0,
        },
        SlotReader { recv },
    )
}

/// Writing half of a slot, created by [`slot`].
///
/// Dropping the writer closes the slot: once any pending value has been taken, the reader's
/// [`SlotReader::wait`] returns [`None`].
pub struct SlotWriter<T> {
    sender: Sender<T>,
    /// Used to evict the pending value when the slot is full.
    drain: Receiver<T>,
    replaced: u64,
}

impl<T> SlotWriter<T> {
    /// Puts `value` into the slot, replacing any value the reader has not taken yet.
    ///
    /// This never blocks.
    pub fn publish(&mut self, mut value: T) {
        loop {
            match self.sender.try_send(value) {
                Ok(()) => return,
                Err(TrySendError::Full(v)) => {
                    // The reader may take the pending value concurrently, then the retry succeeds.
                    if self.drain.try_recv().is_ok() {
                        self.replaced += 1;
                        log::trace!("replaced stale value in slot ({} total)", self.replaced);
                    }
                    value = v;
                }
                // Unreachable while `drain` is alive.
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }

    /// Returns how many published values were replaced before the reader took them.
    pub fn replaced(&self) -> u64 {
        self.replaced
    }
}

/// Reading half of a slot, created by [`slot`].
pub struct SlotReader<T> {
    recv: Receiver<T>,
}

impl<T> SlotReader<T> {
    /// Takes the pending value, if there is one.
    pub fn latest(&self) -> Option<T> {
        let mut value = self.recv.try_recv().ok()?;
        while let Ok(newer) = self.recv.try_recv() {
            value = newer;
        }
        Some(value)
    }

    /// Blocks until a value is published, then takes it.
    ///
    /// Returns [`None`] once the [`SlotWriter`] has been dropped and no value is pending.
    pub fn wait(&self) -> Option<T> {
        let mut value = self.recv.recv().ok()?;
        while let Ok(newer) = self.recv.try_recv() {
            value = newer;
        }
        Some(value)
    }

    /// Returns whether a value is waiting to be taken.
    pub fn is_pending(&self) -> bool {
        !self.recv.is_empty()
    }
}
