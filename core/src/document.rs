use crate::{DocId, Result};
use serde::{Deserialize, Serialize};

/// Axis-aligned lat/lon box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Self {
        Self { min_lat, min_lon, max_lat, max_lon }
    }

    /// Smallest box around the given points. `None` for an empty set.
    pub fn from_points(points: &[(f64, f64)]) -> Option<Self> {
        let (&(lat0, lon0), rest) = points.split_first()?;
        let mut bb = Self::new(lat0, lon0, lat0, lon0);
        for &(lat, lon) in rest {
            bb.min_lat = bb.min_lat.min(lat);
            bb.min_lon = bb.min_lon.min(lon);
            bb.max_lat = bb.max_lat.max(lat);
            bb.max_lon = bb.max_lon.max(lon);
        }
        Some(bb)
    }

    pub fn contains_point(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }

    pub fn contains(&self, other: &BoundingBox) -> bool {
        self.contains_point(other.min_lat, other.min_lon) && self.contains_point(other.max_lat, other.max_lon)
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.min_lat + self.max_lat) / 2.0, (self.min_lon + self.max_lon) / 2.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceKind {
    /// Derived from a way (line or area feature).
    Way,
    /// Derived from a single node.
    Node,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Location {
    Point { lat: f64, lon: f64 },
    Area(BoundingBox),
}

impl Location {
    pub fn center(&self) -> (f64, f64) {
        match *self {
            Location::Point { lat, lon } => (lat, lon),
            Location::Area(bb) => bb.center(),
        }
    }
}

/// A parsed place as delivered by the map-data parser, before it gets a document ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceRecord {
    pub name: String,
    #[serde(default)]
    pub address: String,
    pub kind: PlaceKind,
    pub location: Location,
    /// Unnamed ways are still indexed when they are roads.
    #[serde(default)]
    pub highway: bool,
    #[serde(default)]
    pub place_type: Option<String>,
}

/// An accepted place with its assigned ID; this is what gets indexed and stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub name: String,
    pub address: String,
    pub lat: f64,
    pub lon: f64,
    pub kind: PlaceKind,
    pub place_type: Option<String>,
}

impl Document {
    pub fn new(id: DocId, name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            address: address.into(),
            lat: 0.0,
            lon: 0.0,
            kind: PlaceKind::Node,
            place_type: None,
        }
    }

    pub(crate) fn from_place(id: DocId, place: &PlaceRecord) -> Self {
        let (lat, lon) = place.location.center();
        Self {
            id,
            name: place.name.clone(),
            address: place.address.clone(),
            lat,
            lon,
            kind: place.kind,
            place_type: place.place_type.clone(),
        }
    }
}

/// Receives every completed batch of documents, e.g. to persist full records by ID.
pub trait DocumentSink: Send + Sync {
    fn save_docs(&self, docs: &[Document]) -> Result<()>;
}

impl<S: DocumentSink + ?Sized> DocumentSink for &S {
    fn save_docs(&self, docs: &[Document]) -> Result<()> {
        (**self).save_docs(docs)
    }
}

impl<S: DocumentSink + ?Sized> DocumentSink for std::sync::Arc<S> {
    fn save_docs(&self, docs: &[Document]) -> Result<()> {
        (**self).save_docs(docs)
    }
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DocumentSink for NullSink {
    fn save_docs(&self, _docs: &[Document]) -> Result<()> {
        Ok(())
    }
}
