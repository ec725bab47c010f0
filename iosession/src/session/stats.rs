use std::{
  sync::atomic::{AtomicU64, Ordering},
  time::Instant,
};

use parking_lot::Mutex;

/// Traffic counters of one session.
#[derive(Debug)]
pub struct IoSessionStats {
  created: Instant,
  written_bytes: AtomicU64,
  written_messages: AtomicU64,
  read_bytes: AtomicU64,
  read_messages: AtomicU64,
  last_write: Mutex<Option<Instant>>,
  last_read: Mutex<Option<Instant>>,
}

impl IoSessionStats {
  pub(crate) fn new(created: Instant) -> Self {
    Self {
      created,
      written_bytes: AtomicU64::new(0),
      written_messages: AtomicU64::new(0),
      read_bytes: AtomicU64::new(0),
      read_messages: AtomicU64::new(0),
      last_write: Mutex::new(None),
      last_read: Mutex::new(None),
    }
  }

  pub fn created(&self) -> Instant {
    self.created
  }

  pub fn written_bytes(&self) -> u64 {
    self.written_bytes.load(Ordering::Acquire)
  }

  pub fn written_messages(&self) -> u64 {
    self.written_messages.load(Ordering::Acquire)
  }

  pub fn read_bytes(&self) -> u64 {
    self.read_bytes.load(Ordering::Acquire)
  }

  pub fn read_messages(&self) -> u64 {
    self.read_messages.load(Ordering::Acquire)
  }

  pub fn last_write(&self) -> Option<Instant> {
    *self.last_write.lock()
  }

  pub fn last_read(&self) -> Option<Instant> {
    *self.last_read.lock()
  }

  pub(crate) fn increase_written_bytes(&self, count: usize, at: Instant) {
    if count == 0 {
      return;
    }
    self.written_bytes.fetch_add(count as u64, Ordering::AcqRel);
    bump(&self.last_write, at);
  }

  pub(crate) fn increase_written_messages(&self, at: Instant) {
    self.written_messages.fetch_add(1, Ordering::AcqRel);
    bump(&self.last_write, at);
  }

  pub(crate) fn increase_read_bytes(&self, count: usize, at: Instant) {
    if count == 0 {
      return;
    }
    self.read_bytes.fetch_add(count as u64, Ordering::AcqRel);
    bump(&self.last_read, at);
  }

  pub(crate) fn increase_read_messages(&self, at: Instant) {
    self.read_messages.fetch_add(1, Ordering::AcqRel);
    bump(&self.last_read, at);
  }
}

// Completions may arrive out of timestamp order across threads.
fn bump(slot: &Mutex<Option<Instant>>, at: Instant) {
  let mut last = slot.lock();
  if last.is_none_or(|last| last < at) {
    *last = Some(at);
  }
}
