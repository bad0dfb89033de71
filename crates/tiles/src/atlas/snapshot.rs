use crate::{
    atlas::SubTextureHandle,
    geometry::DrawStyle,
    scene::{BufferId, DrawableId, TextureId},
};
use bevy_log::debug;
use bevy_math::DVec3;
use bevy_platform::collections::HashMap;
use std::{
    ops::Range,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

/// Where a packed drawable lives inside the shared buffers.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawableBinding {
    pub buffer: BufferId,
    pub vertex_range: Range<u32>,
    pub index_range: Range<u32>,
    /// Bound texture per slot.
    pub textures: Vec<Option<TextureId>>,
    /// Display space offset of the packed vertex positions.
    pub origin: DVec3,
    pub style: DrawStyle,
}

/// A consistent view of the texture and drawable mappings of an atlas.
#[derive(Clone, Debug, Default)]
pub struct AtlasSnapshot {
    pub generation: u64,
    /// The atlas page of each sub texture, per animation frame.
    pub textures: HashMap<SubTextureHandle, Vec<TextureId>>,
    pub drawables: HashMap<DrawableId, DrawableBinding>,
}

impl AtlasSnapshot {
    pub fn texture_for_frame(&self, handle: SubTextureHandle, frame: usize) -> Option<TextureId> {
        self.textures.get(&handle)?.get(frame).copied()
    }
}

/// Hands atlas snapshots from the loader to the renderer.
///
/// The loader builds a complete [`AtlasSnapshot`] and replaces the published one
/// in a single step, so readers never observe a partial update.
#[derive(Debug, Default)]
pub struct AtlasSnapshotPublisher {
    current: Mutex<Arc<AtlasSnapshot>>,
    swap_pending: AtomicBool,
    generation: AtomicU64,
}

impl AtlasSnapshotPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the published snapshot.
    ///
    /// `swap_buffers` marks that newly allocated shared buffers have to be
    /// swapped in by the renderer before [`Self::is_ready`] reports true again.
    pub fn publish(&self, mut snapshot: AtlasSnapshot, swap_buffers: bool) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        snapshot.generation = generation;
        let snapshot = Arc::new(snapshot);

        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = snapshot;

        if swap_buffers {
            self.swap_pending.store(true, Ordering::Release);
        }

        debug!("Published atlas snapshot {generation} (swap pending: {swap_buffers}).");

        generation
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Arc<AtlasSnapshot> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Called by the renderer once pending buffers have been swapped in.
    pub fn complete_swap(&self) {
        self.swap_pending.store(false, Ordering::Release);
    }

    /// Whether the loader may submit more work.
    pub fn is_ready(&self) -> bool {
        !self.swap_pending.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn snapshot_with(count: u64) -> AtlasSnapshot {
        let mut snapshot = AtlasSnapshot::default();
        for i in 0..count {
            snapshot
                .textures
                .insert(SubTextureHandle(i), vec![TextureId(count); 2]);
        }
        snapshot
    }

    #[test]
    fn swap_pending_blocks_readiness() {
        let publisher = AtlasSnapshotPublisher::new();
        assert!(publisher.is_ready());

        publisher.publish(snapshot_with(1), false);
        assert!(publisher.is_ready());

        publisher.publish(snapshot_with(2), true);
        assert!(!publisher.is_ready());
        assert_eq!(publisher.snapshot().generation, 2);

        publisher.complete_swap();
        assert!(publisher.is_ready());
    }

    #[test]
    fn readers_only_see_complete_snapshots() {
        let publisher = Arc::new(AtlasSnapshotPublisher::new());

        let reader = {
            let publisher = publisher.clone();
            thread::spawn(move || {
                for _ in 0..1000 {
                    let snapshot = publisher.snapshot();
                    let count = snapshot.textures.len() as u64;

                    // every entry of a snapshot was written by the same publish
                    assert!(snapshot.textures.values().all(|ids| ids == &vec![TextureId(count); 2]));
                }
            })
        };

        for count in 1..200 {
            publisher.publish(snapshot_with(count), false);
        }

        reader.join().unwrap();
        assert_eq!(publisher.snapshot().generation, 199);
    }
}
