//! Staff check-in locations.
//!
//! One document per staff member, keyed by the sanitized name, overwritten on
//! each check-in. Acquiring the coordinates is up to the caller.

use crate::checklist::id::sanitize_key;
use crate::error::{Error, Result};
use crate::traits::{Clock, DocumentStore, Query, WriteMode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Collection holding staff locations.
pub const STAFF_COLLECTION: &str = "staff_locations";

/// Last reported position of one staff member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffLocation {
    /// Display name.
    pub name: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// When the check-in was recorded.
    pub timestamp: DateTime<Utc>,
}

/// Upsert a staff member's location, stamped with the clock's time.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for an empty name or out-of-range
/// coordinates, or an error if the write fails.
pub fn record_location<S: DocumentStore, C: Clock + ?Sized>(
    store: &S,
    clock: &C,
    name: &str,
    latitude: f64,
    longitude: f64,
) -> Result<StaffLocation> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("staff name must not be empty".into()));
    }
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(Error::InvalidInput(format!("latitude {latitude} is outside -90..90")));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(Error::InvalidInput(format!("longitude {longitude} is outside -180..180")));
    }

    let location =
        StaffLocation { name: name.to_string(), latitude, longitude, timestamp: clock.now() };
    let Value::Object(doc) = serde_json::to_value(&location)? else {
        return Err(Error::InvalidInput(format!("could not encode location for '{name}'")));
    };
    store.set(STAFF_COLLECTION, &sanitize_key(name), doc, WriteMode::Replace)?;
    tracing::info!(name, "staff checked in");
    Ok(location)
}

/// Every recorded location, sorted by name.
///
/// # Errors
///
/// Returns an error if the query fails or a document is malformed.
pub fn list_locations<S: DocumentStore>(store: &S) -> Result<Vec<StaffLocation>> {
    let mut locations = store
        .query(STAFF_COLLECTION, &Query::all())?
        .into_iter()
        .map(|doc| Ok(serde_json::from_value(Value::Object(doc.data))?))
        .collect::<Result<Vec<StaffLocation>>>()?;
    locations.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(locations)
}
