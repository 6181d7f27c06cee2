//! Single-slot, last-write-wins hand-off of the newest analysis frame.

use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::frame::AnalysisFrame;

struct Slot {
    latest: ArcSwap<AnalysisFrame>,
    published: AtomicU64,
}

/// Shared slot holding the most recently published [`AnalysisFrame`].
///
/// Cloning yields another handle onto the same slot. The producer swaps in a
/// whole frame at a time, so a reader never sees fields from two different
/// sampling instants. There is no queue: slow readers skip frames and fast
/// readers see the same frame again.
#[derive(Clone)]
pub struct FrameChannel {
    slot: Arc<Slot>,
}

impl Default for FrameChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameChannel {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Slot {
                latest: ArcSwap::from_pointee(AnalysisFrame::ZERO),
                published: AtomicU64::new(0),
            }),
        }
    }

    /// Replace the slot content. Never blocks.
    pub fn publish(&self, frame: AnalysisFrame) {
        self.slot.latest.store(Arc::new(frame));
        self.slot.published.fetch_add(1, Ordering::Release);
    }

    /// Newest frame, or [`AnalysisFrame::ZERO`] if nothing was published yet.
    pub fn latest(&self) -> AnalysisFrame {
        **self.slot.latest.load()
    }

    /// Number of frames published over the channel's lifetime.
    pub fn publish_count(&self) -> u64 {
        self.slot.published.load(Ordering::Acquire)
    }
}
