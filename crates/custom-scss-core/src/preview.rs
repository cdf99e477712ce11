//! Live preview bridge.
//!
//! Turns change notifications from an editing session into resolved CSS
//! and hands it to a [`RenderSurface`], which swaps the stylesheet for one
//! document in place instead of reloading the page.
//!
//! Notifications for the same document may overlap. Each one takes a
//! generation number; a result is delivered only if no newer notification
//! for that document started in the meantime.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::StoreError;
use crate::models::DraftOverlay;
use crate::resolve::{PreviewOutcome, Resolver};

/// Receives resolved CSS for a document and re-renders that region only.
pub trait RenderSurface: Send + Sync {
    fn render(&self, document_id: &str, css: &str);
}

/// A content or mode change in the editing session.
#[derive(Debug, Clone)]
pub struct ChangeNotification {
    pub document_id: String,
    pub overlay: DraftOverlay,
}

/// What happened to a notification.
#[derive(Debug, Clone)]
pub enum Delivery {
    /// The surface received the outcome's CSS.
    Rendered(PreviewOutcome),
    /// A newer notification for the same document superseded this one.
    Superseded,
}

/// Connects editing-session changes to a render surface.
pub struct PreviewBridge {
    resolver: Arc<Resolver>,
    surface: Arc<dyn RenderSurface>,
    generations: Mutex<HashMap<String, u64>>,
}

impl PreviewBridge {
    pub fn new(resolver: Arc<Resolver>, surface: Arc<dyn RenderSurface>) -> Self {
        Self {
            resolver,
            surface,
            generations: Mutex::new(HashMap::new()),
        }
    }

    pub fn resolver(&self) -> &Arc<Resolver> {
        &self.resolver
    }

    /// Recompute the previewed CSS for a change and render it.
    ///
    /// Plain CSS drafts come back from the resolver as-is, without a compile.
    pub async fn notify(&self, change: ChangeNotification) -> Result<Delivery, StoreError> {
        let generation = self.begin(&change.document_id);

        let outcome = self
            .resolver
            .preview(&change.document_id, &change.overlay)
            .await?;

        if !self.is_current(&change.document_id, generation) {
            tracing::debug!(document_id = %change.document_id, generation, "discarding superseded preview");
            return Ok(Delivery::Superseded);
        }

        self.surface.render(&change.document_id, &outcome.css);
        Ok(Delivery::Rendered(outcome))
    }

    fn begin(&self, document_id: &str) -> u64 {
        let mut generations = self
            .generations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let entry = generations.entry(document_id.to_string()).or_insert(0);
        *entry += 1;
        *entry
    }

    fn is_current(&self, document_id: &str, generation: u64) -> bool {
        let generations = self
            .generations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        generations.get(document_id).copied() == Some(generation)
    }
}
