//! Saved waypoint sets
//!
//! Every save is archived locally so earlier walks can be exported again
//! after the AR session is gone.

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use waypoint_markers::ExportedMarker;
use waypoint_storage::Database;
use waypoint_xr::SpaceType;

use crate::error::CoreError;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedSet {
    pub id: String,
    /// AR session the markers were placed in
    pub session_id: String,
    pub saved_at: DateTime<Utc>,
    pub markers: Vec<ExportedMarker>,
}

impl ArchivedSet {
    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }
}

const LAST_SPACE_KEY: &str = "last_space";

pub struct WaypointArchive {
    db: Database,
}

impl WaypointArchive {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn record(&self, session_id: &str, markers: &[ExportedMarker]) -> Result<ArchivedSet> {
        let set = ArchivedSet {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            saved_at: Utc::now(),
            markers: markers.to_vec(),
        };

        self.db.transaction(|conn| {
            conn.execute(
                "INSERT INTO saved_sets (id, session_id, saved_at, marker_count, markers)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    set.id,
                    set.session_id,
                    set.saved_at.to_rfc3339(),
                    set.markers.len() as i64,
                    serde_json::to_string(&set.markers)?,
                ],
            )?;
            Ok(())
        })?;

        tracing::info!(
            set_id = %set.id,
            session_id = %set.session_id,
            marker_count = set.marker_count(),
            "Archived saved markers"
        );

        Ok(set)
    }

    /// All saved sets, newest first
    pub fn list(&self) -> Result<Vec<ArchivedSet>> {
        let sets = self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, saved_at, markers FROM saved_sets
                 ORDER BY saved_at DESC",
            )?;

            let sets: Vec<ArchivedSet> = stmt
                .query_map([], row_to_set)?
                .filter_map(|r| r.ok())
                .collect();

            Ok(sets)
        })?;

        Ok(sets)
    }

    pub fn load(&self, id: &str) -> Result<ArchivedSet> {
        self.db
            .with_connection(|conn| {
                let set = conn
                    .query_row(
                        "SELECT id, session_id, saved_at, markers FROM saved_sets WHERE id = ?1",
                        [id],
                        row_to_set,
                    )
                    .optional()?;
                Ok(set)
            })?
            .ok_or_else(|| CoreError::ArchiveNotFound(id.to_string()))
    }

    pub fn delete(&self, id: &str) -> Result<bool> {
        let removed = self.db.with_connection(|conn| {
            Ok(conn.execute("DELETE FROM saved_sets WHERE id = ?1", [id])?)
        })?;

        if removed > 0 {
            tracing::info!(set_id = %id, "Deleted saved markers");
        }

        Ok(removed > 0)
    }

    /// Reference space the most recent session settled on
    pub fn last_space(&self) -> Result<Option<SpaceType>> {
        let value = self.db.get_setting(LAST_SPACE_KEY)?;
        Ok(value.and_then(|v| v.parse().ok()))
    }

    pub fn remember_space(&self, space: SpaceType) -> Result<()> {
        self.db.set_setting(LAST_SPACE_KEY, space.as_str())?;
        Ok(())
    }
}

fn row_to_set(row: &rusqlite::Row<'_>) -> rusqlite::Result<ArchivedSet> {
    let saved_str: String = row.get(2)?;
    let markers_json: String = row.get(3)?;

    let saved_at = DateTime::parse_from_rfc3339(&saved_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());
    let markers: Vec<ExportedMarker> = serde_json::from_str(&markers_json).unwrap_or_default();

    Ok(ArchivedSet {
        id: row.get(0)?,
        session_id: row.get(1)?,
        saved_at,
        markers,
    })
}
