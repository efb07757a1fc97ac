//! Read-after-write routing for freshly saved programs
//!
//! Replicas can lag behind the primary for a short time after a program is
//! written. The tracker remembers recent writes so reads of those programs
//! are sent to the primary until the window has passed.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyConfig {
  /// How long after a write reads must go to the primary
  pub window: Duration,
}

impl Default for ConsistencyConfig {
  fn default() -> Self {
    Self {
      window: Duration::from_secs(5),
    }
  }
}

pub struct ReadAfterWriteTracker {
  window: chrono::Duration,
  writes: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl ReadAfterWriteTracker {
  pub fn new(config: ConsistencyConfig) -> Self {
    // Windows too large for chrono are effectively "always primary"
    let window =
      chrono::Duration::from_std(config.window).unwrap_or_else(|_| chrono::Duration::days(365));
    Self {
      window,
      writes: Mutex::new(HashMap::new()),
    }
  }

  pub fn record_write(&self, program_id: &str) {
    self.record_write_at(program_id, Utc::now());
  }

  pub fn record_write_at(&self, program_id: &str, at: DateTime<Utc>) {
    let mut writes = self.lock();
    writes.insert(program_id.to_string(), at);
    debug!(program_id, tracked = writes.len(), "Recorded program write");
  }

  pub fn should_read_from_primary(&self, program_id: &str) -> bool {
    self.should_read_from_primary_at(program_id, Utc::now())
  }

  pub fn should_read_from_primary_at(&self, program_id: &str, now: DateTime<Utc>) -> bool {
    self
      .lock()
      .get(program_id)
      .map_or(false, |written| now - *written < self.window)
  }

  /// Forget writes older than the window; returns how many were dropped
  pub fn cleanup(&self) -> usize {
    self.cleanup_at(Utc::now())
  }

  pub fn cleanup_at(&self, now: DateTime<Utc>) -> usize {
    let mut writes = self.lock();
    let before = writes.len();
    writes.retain(|_, written| now - *written < self.window);
    before - writes.len()
  }

  pub fn tracked(&self) -> usize {
    self.lock().len()
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, DateTime<Utc>>> {
    // Each critical section is a single map operation, so a poisoned map is still consistent
    self.writes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}

impl Default for ReadAfterWriteTracker {
  fn default() -> Self {
    Self::new(ConsistencyConfig::default())
  }
}
