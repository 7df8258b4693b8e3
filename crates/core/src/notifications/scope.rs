use super::manager::{NotificationPlacement, NotificationSink};
use super::message::{NotificationId, NotificationMessage};
use crate::error::NotificationError;
use indexmap::{IndexMap, IndexSet};
use parking_lot::Mutex;
use std::sync::Arc;

/// Places through a parent and withdraws everything it placed on dispose.
///
/// `cancel` only reaches placements made through this scope, including
/// those of scopes nested inside it.
pub struct NotificationScope {
    parent: Arc<dyn NotificationSink>,
    /// `None` once disposed.
    placed: Mutex<Option<IndexSet<NotificationId>>>,
}

impl NotificationScope {
    pub fn new(parent: Arc<dyn NotificationSink>) -> Self {
        Self {
            parent,
            placed: Mutex::new(Some(IndexSet::new())),
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.placed.lock().is_none()
    }

    pub fn placements(&self) -> Vec<NotificationPlacement> {
        self.placed
            .lock()
            .iter()
            .flatten()
            .map(|id| NotificationPlacement { id: *id })
            .collect()
    }

    /// Cancels every placement of this scope. Idempotent.
    pub fn dispose(&self) -> Result<(), NotificationError> {
        let Some(placed) = self.placed.lock().take() else {
            return Ok(());
        };
        for id in placed {
            self.parent.cancel(&NotificationPlacement { id })?;
        }
        Ok(())
    }
}

impl NotificationSink for NotificationScope {
    fn place(
        &self,
        message: NotificationMessage,
    ) -> Result<NotificationPlacement, NotificationError> {
        if self.is_disposed() {
            return Err(NotificationError::Disposed);
        }
        let placement = self.parent.place(message)?;
        match self.placed.lock().as_mut() {
            Some(placed) => {
                placed.insert(placement.id);
                Ok(placement)
            }
            None => {
                // Disposed while the parent was placing.
                self.parent.cancel(&placement)?;
                Err(NotificationError::Disposed)
            }
        }
    }

    fn cancel(&self, placement: &NotificationPlacement) -> Result<(), NotificationError> {
        let owned = match self.placed.lock().as_mut() {
            Some(placed) => placed.shift_remove(&placement.id),
            None => return Err(NotificationError::Disposed),
        };
        if owned {
            self.parent.cancel(placement)?;
        }
        Ok(())
    }
}

impl Drop for NotificationScope {
    fn drop(&mut self) {
        if let Err(e) = self.dispose() {
            tracing::debug!("Notification scope cleanup failed: {}", e);
        }
    }
}

#[derive(Debug, Clone)]
struct RecordedNotification {
    message: NotificationMessage,
    published: Option<NotificationPlacement>,
}

/// Collects notifications and places them only on [`publish`](Self::publish).
pub struct NotificationRecorder {
    parent: Arc<dyn NotificationSink>,
    /// `None` once disposed.
    records: Mutex<Option<IndexMap<NotificationId, RecordedNotification>>>,
}

impl NotificationRecorder {
    pub fn new(parent: Arc<dyn NotificationSink>) -> Self {
        Self {
            parent,
            records: Mutex::new(Some(IndexMap::new())),
        }
    }

    pub fn recorded(&self) -> Vec<NotificationMessage> {
        self.records
            .lock()
            .iter()
            .flat_map(|records| records.values())
            .map(|r| r.message.clone())
            .collect()
    }

    /// Places every record not yet published, in recording order.
    pub fn publish(&self) -> Result<(), NotificationError> {
        let mut records = self.records.lock();
        let records = records.as_mut().ok_or(NotificationError::Disposed)?;
        for record in records.values_mut() {
            if record.published.is_some() {
                continue;
            }
            record.published = Some(self.parent.place(record.message.clone())?);
        }
        Ok(())
    }

    /// Cancels every published record. Idempotent.
    pub fn dispose(&self) -> Result<(), NotificationError> {
        let Some(records) = self.records.lock().take() else {
            return Ok(());
        };
        for record in records.into_values() {
            if let Some(placement) = record.published {
                self.parent.cancel(&placement)?;
            }
        }
        Ok(())
    }
}

impl NotificationSink for NotificationRecorder {
    fn place(
        &self,
        message: NotificationMessage,
    ) -> Result<NotificationPlacement, NotificationError> {
        let mut records = self.records.lock();
        let records = records.as_mut().ok_or(NotificationError::Disposed)?;
        let id = NotificationId::next();
        records.insert(
            id,
            RecordedNotification {
                message,
                published: None,
            },
        );
        Ok(NotificationPlacement { id })
    }

    fn cancel(&self, placement: &NotificationPlacement) -> Result<(), NotificationError> {
        let removed = {
            let mut records = self.records.lock();
            let records = records.as_mut().ok_or(NotificationError::Disposed)?;
            records.shift_remove(&placement.id)
        };
        if let Some(published) = removed.and_then(|r| r.published) {
            self.parent.cancel(&published)?;
        }
        Ok(())
    }
}

impl Drop for NotificationRecorder {
    fn drop(&mut self) {
        if let Err(e) = self.dispose() {
            tracing::debug!("Notification recorder cleanup failed: {}", e);
        }
    }
}
