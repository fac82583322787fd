//! Push-model frame dispatch.

use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use log::{error, info};
use parking_lot::Mutex;

use crate::error::TrackerError;
use crate::tracker::{Frame, MotionTracker};

struct Listener {
    id: u64,
    name: &'static str,
    tracker: Arc<dyn MotionTracker>,
}

/// Delivers frames synchronously to every attached tracker.
///
/// The registry lock is held for the whole of [`FrameSource::deliver`], so
/// detaching a tracker waits for an in-flight frame and no callback reaches
/// a tracker after its handle is gone. A tracker must not drop its own
/// [`Attached`] handle from inside `on_frame`.
#[derive(Default)]
pub struct FrameSource {
    listeners: Mutex<Vec<Listener>>,
    next_id: AtomicU64,
}

impl FrameSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register `tracker`; it receives frames until the handle is dropped.
    pub fn attach<T: MotionTracker + 'static>(self: &Arc<Self>, tracker: T) -> Attached<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let name = short_type_name::<T>();
        let tracker = Arc::new(tracker);
        self.listeners.lock().push(Listener {
            id,
            name,
            tracker: Arc::clone(&tracker) as Arc<dyn MotionTracker>,
        });
        info!("attached {name} as listener {id}");
        Attached {
            tracker,
            source: Arc::downgrade(self),
            id,
        }
    }

    /// Hand `frame` to every attached tracker in attach order.
    ///
    /// All trackers see the frame even if one fails; the first error is
    /// returned.
    pub fn deliver(&self, frame: &Frame) -> Result<(), TrackerError> {
        let listeners = self.listeners.lock();
        let mut first_error = None;
        for listener in listeners.iter() {
            if let Err(e) = listener.tracker.on_frame(frame) {
                error!("{} (listener {}) failed: {e}", listener.name, listener.id);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    fn detach(&self, id: u64) {
        let mut listeners = self.listeners.lock();
        if let Some(pos) = listeners.iter().position(|l| l.id == id) {
            let listener = listeners.remove(pos);
            info!("detached {} (listener {id})", listener.name);
        }
    }
}

/// Registration handle returned by [`FrameSource::attach`].
///
/// Derefs to the tracker. Dropping it unregisters the tracker.
pub struct Attached<T: MotionTracker + 'static> {
    tracker: Arc<T>,
    source: Weak<FrameSource>,
    id: u64,
}

impl<T: MotionTracker + 'static> Attached<T> {
    /// Shared reference for reader threads.
    ///
    /// Readers holding it keep the tracker alive after detachment, but it
    /// no longer receives frames.
    pub fn handle(&self) -> Arc<T> {
        Arc::clone(&self.tracker)
    }

    pub fn detach(self) {
        drop(self);
    }
}

impl<T: MotionTracker + 'static> Deref for Attached<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.tracker
    }
}

impl<T: MotionTracker + 'static> Drop for Attached<T> {
    fn drop(&mut self) {
        if let Some(source) = self.source.upgrade() {
            source.detach(self.id);
        }
    }
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
