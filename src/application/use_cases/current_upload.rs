use std::sync::RwLock;

/// The upload that requests without an explicit id refer to.
#[derive(Debug, Default)]
pub struct CurrentUpload {
    id: RwLock<Option<i64>>,
}

impl CurrentUpload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<i64> {
        *self.id.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set(&self, upload_id: i64) {
        *self.id.write().unwrap_or_else(|e| e.into_inner()) = Some(upload_id);
    }

    pub fn clear(&self) {
        *self.id.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Clear only if the pointer currently refers to `upload_id`.
    pub fn clear_if(&self, upload_id: i64) -> bool {
        let mut current = self.id.write().unwrap_or_else(|e| e.into_inner());
        if *current == Some(upload_id) {
            *current = None;
            true
        } else {
            false
        }
    }
}
