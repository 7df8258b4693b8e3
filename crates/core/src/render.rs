use modula_api::{RenderTarget, RenderedView};
use parking_lot::Mutex;

/// Render target that keeps every view it was asked to display.
#[derive(Debug, Default)]
pub struct RecordingRenderTarget {
    views: Mutex<Vec<RenderedView>>,
}

impl RecordingRenderTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn views(&self) -> Vec<RenderedView> {
        self.views.lock().clone()
    }

    pub fn last(&self) -> Option<RenderedView> {
        self.views.lock().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.views.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.lock().is_empty()
    }

    /// Removes and returns everything recorded so far.
    pub fn take(&self) -> Vec<RenderedView> {
        std::mem::take(&mut *self.views.lock())
    }
}

impl RenderTarget for RecordingRenderTarget {
    fn render(&self, view: RenderedView) {
        tracing::trace!("Render {:?}", view);
        self.views.lock().push(view);
    }
}
