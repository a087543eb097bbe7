//! Optional progress reporting for long-running scans.
//!
//! Components call [`Progress::report`] at coarse milestones (one rule, one
//! unit). Whether a callback is attached never changes a computed result.

use tracing::debug;

/// Wraps an optional caller-supplied status callback.
pub struct Progress<'a> {
    callback: Option<&'a mut dyn FnMut(&str)>,
}

impl<'a> Progress<'a> {
    /// No callback; milestones only reach the debug log.
    pub fn silent() -> Self {
        Self { callback: None }
    }

    pub fn new(callback: &'a mut dyn FnMut(&str)) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    pub fn report(&mut self, message: impl AsRef<str>) {
        let message = message.as_ref();
        debug!(progress = %message);
        if let Some(cb) = self.callback.as_mut() {
            cb(message);
        }
    }
}

impl Default for Progress<'_> {
    fn default() -> Self {
        Self::silent()
    }
}
