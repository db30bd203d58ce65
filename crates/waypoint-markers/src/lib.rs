//! Waypoint markers
//!
//! Placed markers live only in a [`MarkerStore`]; numbering is 1-based and
//! gap-free until the store is cleared. Exports are owned snapshots.

mod error;
mod export;
mod marker;
mod placement;
mod store;

pub use error::MarkerError;
pub use export::{export_file_name, to_json_pretty, ExportFile};
pub use marker::{coordinate_label, ExportedMarker, Marker, Position};
pub use placement::{resolve_position, FallbackPlacement, Placement, PlacementSource};
pub use store::MarkerStore;

pub type Result<T> = std::result::Result<T, MarkerError>;
