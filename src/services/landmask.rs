//! Land/water classification for incident coordinates.
//!
//! The pipeline only ever asks one question of a coordinate: land or water.
//! `LandClassifier` is the seam; the shipped [`CoarseLandMask`] answers it
//! with a fixed set of bounding boxes covering the continental US, Alaska
//! and Hawaii, with the Great Lakes carved back out as water. Deterministic
//! by construction: same coordinate, same answer, no I/O.

/// Pure land/water oracle. Total over valid coordinate ranges.
pub trait LandClassifier: Send + Sync {
    fn is_land(&self, latitude: f64, longitude: f64) -> bool;
}

#[derive(Debug, Clone, Copy)]
struct BoundingBox {
    south: f64,
    north: f64,
    west: f64,
    east: f64,
}

impl BoundingBox {
    const fn contains(&self, latitude: f64, longitude: f64) -> bool {
        latitude >= self.south
            && latitude <= self.north
            && longitude >= self.west
            && longitude <= self.east
    }
}

/// US landmass, coarsely. The continental US is covered by latitude
/// bands whose east and west edges follow the coastline, so the open
/// Atlantic and Pacific inside one big rectangle do not read as land.
const LAND_BOXES: &[BoundingBox] = &[
    // Gulf coast and Florida
    BoundingBox {
        south: 24.5,
        north: 31.0,
        west: -106.6,
        east: -80.0,
    },
    // Southern tier, San Diego to the Carolinas
    BoundingBox {
        south: 31.0,
        north: 35.0,
        west: -118.6,
        east: -77.7,
    },
    // Mid band out to Cape Hatteras
    BoundingBox {
        south: 35.0,
        north: 37.0,
        west: -122.5,
        east: -75.5,
    },
    // Northern tier, Pacific Northwest to Maine
    BoundingBox {
        south: 37.0,
        north: 49.0,
        west: -124.8,
        east: -66.9,
    },
    // Alaska
    BoundingBox {
        south: 54.0,
        north: 71.5,
        west: -168.0,
        east: -130.0,
    },
    // Hawaii
    BoundingBox {
        south: 18.9,
        north: 22.3,
        west: -160.3,
        east: -154.7,
    },
];

/// Large inland water bodies inside the land boxes.
const WATER_BOXES: &[BoundingBox] = &[
    // Lake Superior
    BoundingBox {
        south: 46.5,
        north: 48.9,
        west: -91.9,
        east: -84.4,
    },
    // Lake Michigan
    BoundingBox {
        south: 41.7,
        north: 45.9,
        west: -87.9,
        east: -85.0,
    },
    // Lake Huron
    BoundingBox {
        south: 43.1,
        north: 45.9,
        west: -84.5,
        east: -80.0,
    },
    // Lake Erie
    BoundingBox {
        south: 41.4,
        north: 42.8,
        west: -83.3,
        east: -79.0,
    },
    // Lake Ontario
    BoundingBox {
        south: 43.3,
        north: 44.1,
        west: -79.7,
        east: -76.2,
    },
];

/// Bounding-box land mask for the dataset's coverage area.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoarseLandMask;

impl LandClassifier for CoarseLandMask {
    fn is_land(&self, latitude: f64, longitude: f64) -> bool {
        if WATER_BOXES.iter().any(|b| b.contains(latitude, longitude)) {
            return false;
        }
        LAND_BOXES.iter().any(|b| b.contains(latitude, longitude))
    }
}
