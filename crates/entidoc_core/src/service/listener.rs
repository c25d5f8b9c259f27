//! Save and delete notifications.

use crate::error::CoreResult;

/// Whether a save created or replaced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifyType {
    /// The entity had no identity before the save.
    Insert,
    /// The entity replaced its stored version.
    Update,
}

/// Receives entities after the pipeline has persisted them.
///
/// An error from a hook is reported like any other unexpected failure of
/// the operation; the write itself is not undone.
pub trait EntityListener<E>: Send + Sync {
    /// Called after `entity` was saved.
    fn on_entity_saved(&self, entity: &E, notify: NotifyType) -> CoreResult<()> {
        let _ = (entity, notify);
        Ok(())
    }

    /// Called after `entity` was deleted.
    fn on_entity_deleted(&self, entity: &E) -> CoreResult<()> {
        let _ = entity;
        Ok(())
    }
}
