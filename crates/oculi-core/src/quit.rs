// SPDX-License-Identifier: CEPL-1.0
use portable_atomic::{AtomicBool, Ordering};
use std::fmt;
use std::sync::Arc;

/// Shutdown request shared between a signal handler and the frame loop.
///
/// Only ever flips from `false` to `true`, so relaxed loads are enough.
#[derive(Clone)]
pub struct QuitFlag(Arc<AtomicBool>);

impl QuitFlag {
    pub fn new() -> Self {
        QuitFlag(Arc::new(AtomicBool::new(false)))
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl Default for QuitFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for QuitFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("QuitFlag").field(&self.is_requested()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let flag = QuitFlag::new();
        let handler_side = flag.clone();
        assert!(!flag.is_requested());
        handler_side.request();
        assert!(flag.is_requested());
        handler_side.request();
        assert!(flag.is_requested());
    }

    #[test]
    fn visible_across_threads() {
        let flag = QuitFlag::new();
        let other = flag.clone();
        std::thread::spawn(move || other.request())
            .join()
            .unwrap();
        assert!(flag.is_requested());
    }
}
