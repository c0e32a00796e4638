//! # Epoch Resetter
//!
//! Truncates the store once a day. The trigger is a one-minute window
//! (`hour:minute`, local time): a cycle that happens to run at any other
//! minute does not reset, so a drifting cadence can skip a day.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;

use chrono::Timelike;
use log::info;

use crate::errors::IngestError;

/// The minute of the day during which the store is truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetWindow {
    /// Hour, 0-23.
    pub hour: u32,
    /// Minute, 0-59.
    pub minute: u32,
}

impl ResetWindow {
    /// 00:00, the default window.
    pub const MIDNIGHT: Self = Self { hour: 0, minute: 0 };

    /// Creates a window at `hour:minute`.
    pub const fn new(hour: u32, minute: u32) -> Self {
        Self { hour, minute }
    }

    /// True when `now` falls inside the window.
    pub fn contains<T: Timelike>(&self, now: &T) -> bool {
        now.hour() == self.hour && now.minute() == self.minute
    }
}

impl Default for ResetWindow {
    fn default() -> Self {
        Self::MIDNIGHT
    }
}

/// Truncates the store to zero length if `now` is inside `window` and the
/// store exists. Returns whether a truncation happened.
///
/// The header goes too; the next merge rewrites it.
pub fn maybe_reset<T: Timelike>(
    store_path: &Path,
    now: &T,
    window: ResetWindow,
) -> Result<bool, IngestError> {
    if !window.contains(now) {
        return Ok(false);
    }

    // No `create`: an absent store stays absent.
    match OpenOptions::new().write(true).truncate(true).open(store_path) {
        Ok(_) => {
            info!("CSV reset successfully at {:02}:{:02}", window.hour, window.minute);
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(IngestError::Reset {
            path: store_path.to_path_buf(),
            source,
        }),
    }
}
