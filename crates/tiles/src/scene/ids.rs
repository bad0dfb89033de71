use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Every scene object shares one id space, so ids never collide between
/// drawables added directly and drawables packed by an atlas.
fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

macro_rules! scene_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl $name {
            /// Allocates a fresh, process wide unique id.
            pub fn next() -> Self {
                Self(next_id())
            }
        }
    };
}

scene_id!(
    /// A drawable of the scene, either standalone or packed into a shared buffer.
    DrawableId
);
scene_id!(
    /// A texture of the scene, either standalone or an atlas page.
    TextureId
);
scene_id!(
    /// A shared vertex/index buffer drawables are packed into.
    BufferId
);
scene_id!(
    /// The shader program drawables are rendered with.
    ProgramId
);
