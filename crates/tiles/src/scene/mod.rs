//! Identifiers of scene objects and the change requests that mutate the scene.
//!
//! Nothing in this crate touches the renderer directly. Every mutation is
//! recorded as a [`ChangeRequest`] inside a [`ChangeSet`], which the loader
//! hands to the renderer once per pass.

mod changes;
mod ids;

pub use self::{
    changes::{ChangeRequest, ChangeSet, TextureData},
    ids::{BufferId, DrawableId, ProgramId, TextureId},
};
