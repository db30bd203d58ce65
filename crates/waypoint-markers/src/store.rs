//! Marker store
//!
//! Owns every placed marker together with the visual handle the renderer
//! returned for it. Nothing else removes markers; [`MarkerStore::clear`]
//! hands the visuals back so the caller can release them.

use glam::Vec3;

use crate::marker::{ExportedMarker, Marker};

pub const DEFAULT_LABEL_PREFIX: &str = "Marker";

struct Placed<V> {
    marker: Marker,
    visual: V,
}

pub struct MarkerStore<V = ()> {
    placed: Vec<Placed<V>>,
    next_sequence: u32,
    label_prefix: String,
}

impl<V> MarkerStore<V> {
    pub fn new() -> Self {
        Self::with_label_prefix(DEFAULT_LABEL_PREFIX)
    }

    pub fn with_label_prefix(prefix: impl Into<String>) -> Self {
        Self {
            placed: Vec::new(),
            next_sequence: 1,
            label_prefix: prefix.into(),
        }
    }

    /// Append a marker, creating its visual through `attach`
    pub fn place_with<F>(&mut self, position: Vec3, attach: F) -> Marker
    where
        F: FnOnce(&Marker) -> V,
    {
        let marker = Marker::new(self.next_sequence, position, &self.label_prefix);
        self.next_sequence += 1;

        let visual = attach(&marker);
        self.placed.push(Placed {
            marker: marker.clone(),
            visual,
        });

        tracing::debug!(
            sequence = marker.sequence,
            x = position.x,
            y = position.y,
            z = position.z,
            "Placed marker"
        );

        marker
    }

    /// Remove everything and restart numbering at 1
    pub fn clear(&mut self) -> Vec<V> {
        self.next_sequence = 1;
        self.placed.drain(..).map(|p| p.visual).collect()
    }

    pub fn export(&self) -> Vec<ExportedMarker> {
        self.placed.iter().map(|p| p.marker.export()).collect()
    }

    pub fn count(&self) -> usize {
        self.placed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placed.is_empty()
    }

    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        self.placed.iter().map(|p| &p.marker)
    }

    pub fn last(&self) -> Option<&Marker> {
        self.placed.last().map(|p| &p.marker)
    }
}

impl MarkerStore<()> {
    pub fn place(&mut self, position: Vec3) -> Marker {
        self.place_with(position, |_| ())
    }
}

impl<V> Default for MarkerStore<V> {
    fn default() -> Self {
        Self::new()
    }
}
