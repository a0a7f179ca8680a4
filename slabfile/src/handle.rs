//! Scoped storage handles.

use crate::storage::{ObjectId, SharedBackend};

/// An owned handle to an object held open by the storage runtime.
///
/// Handles are scarce, process-wide resources. An [`ObjectHandle`] is
/// move-only and releases its underlying handle exactly once, when dropped,
/// on every exit path.
#[derive(Debug)]
pub struct ObjectHandle {
    backend: SharedBackend,
    id: ObjectId,
}

impl ObjectHandle {
    pub(crate) fn new(backend: SharedBackend, id: ObjectId) -> Self {
        Self { backend, id }
    }

    /// Return the storage backend that issued the handle.
    #[must_use]
    pub fn backend(&self) -> &SharedBackend {
        &self.backend
    }

    /// Return the object id.
    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.id
    }
}

impl Drop for ObjectHandle {
    fn drop(&mut self) {
        if let Err(err) = self.backend.close_object(self.id) {
            log::warn!("failed to release object handle {}: {err}", self.id);
        }
    }
}
