//! Output frame store: publishes the latest finished result.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, MutexGuard};

use crate::frame::TextureHandle;
use crate::gpu::RenderTarget;

/// One GPU render target plus the cross-thread "update pending" flag.
///
/// The render thread writes the target and sets the flag (release
/// ordering); the controller reads the flag (acquire ordering) and clears
/// it after wrapping the result. The flag is set only after a GPU
/// completion fence, so an observed `true` always has fully written pixels
/// behind it.
pub struct OutputStore {
    target: Mutex<Option<RenderTarget>>,
    pending: AtomicBool,
}

impl OutputStore {
    pub fn new() -> Self {
        Self {
            target: Mutex::new(None),
            pending: AtomicBool::new(false),
        }
    }

    /// Exclusive access to the render target slot. Mutation happens only on
    /// the render thread; the controller locks briefly to read.
    pub(crate) fn target(&self) -> MutexGuard<'_, Option<RenderTarget>> {
        self.target.lock()
    }

    /// Signal a newly finished result. Render thread only.
    pub fn mark_pending(&self) {
        self.pending.store(true, Ordering::Release);
    }

    pub fn has_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Consume the pending signal. Controller only.
    pub fn clear_pending(&self) {
        self.pending.store(false, Ordering::Release);
    }

    /// Snapshot of the published texture, if one has been allocated.
    pub fn published(&self) -> Option<(TextureHandle, u32, u32)> {
        let guard = self.target.lock();
        let target = guard.as_ref()?;
        let handle = target.handle()?.clone();
        Some((handle, target.width(), target.height()))
    }

    /// Release the render target; runs on the render thread at teardown.
    pub(crate) fn release_target(&self) {
        let mut guard = self.target.lock();
        if let Some(target) = guard.as_mut() {
            target.release();
        }
        *guard = None;
        self.pending.store(false, Ordering::Release);
    }
}

impl Default for OutputStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_flag_round_trip() {
        let store = OutputStore::new();
        assert!(!store.has_pending());
        store.mark_pending();
        assert!(store.has_pending());
        store.clear_pending();
        assert!(!store.has_pending());
    }

    #[test]
    fn published_is_none_before_allocation() {
        let store = OutputStore::new();
        assert!(store.published().is_none());
        // A pending flag without a target never yields a publishable result
        store.mark_pending();
        assert!(store.published().is_none());
    }

    #[test]
    fn release_target_clears_pending() {
        let store = OutputStore::new();
        store.mark_pending();
        store.release_target();
        assert!(!store.has_pending());
        assert!(store.published().is_none());
    }
}
