//! Grid-to-catalog coordinate conversion.
//!
//! Points travel through geographic coordinates: the grid projection's
//! inverse gives (lon, lat), the catalog projection's forward gives catalog
//! metres. Both projections are injected so tests can swap in simple ones.

pub mod ellipsoid;
pub mod lambert_conformal;
pub mod transverse_mercator;

use crate::domain::Point;
use crate::error::TileplanError;

use ellipsoid::{GRS80, WGS84};
use lambert_conformal::LambertConformalConic;
use transverse_mercator::TransverseMercator;

/// A map projection with forward and inverse transforms.
pub trait Projection: Send + Sync {
    /// (lon_rad, lat_rad) -> (easting, northing)
    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), TileplanError>;

    /// (easting, northing) -> (lon_rad, lat_rad)
    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64), TileplanError>;
}

pub struct ProjectionEngine {
    grid: Box<dyn Projection>,
    catalog: Box<dyn Projection>,
}

impl ProjectionEngine {
    pub fn new(grid: Box<dyn Projection>, catalog: Box<dyn Projection>) -> Self {
        Self { grid, catalog }
    }

    /// UTM zone 19N on WGS84 for the grid, NAD83 Massachusetts Mainland
    /// (EPSG:26986) for the catalog. NAD83 is taken as coincident with WGS84.
    pub fn massgis() -> Self {
        Self::new(Box::new(utm_zone_19n()), Box::new(massachusetts_mainland()))
    }

    pub fn to_catalog(&self, point: Point) -> Result<Point, TileplanError> {
        let (lon, lat) = self.grid.inverse(point.x, point.y)?;
        let (x, y) = self.catalog.forward(lon, lat)?;
        finite(Point::new(x, y))
    }

    pub fn to_grid(&self, point: Point) -> Result<Point, TileplanError> {
        let (lon, lat) = self.catalog.inverse(point.x, point.y)?;
        let (x, y) = self.grid.forward(lon, lat)?;
        finite(Point::new(x, y))
    }
}

fn finite(point: Point) -> Result<Point, TileplanError> {
    if point.x.is_finite() && point.y.is_finite() {
        Ok(point)
    } else {
        Err(TileplanError::Projection(format!(
            "non-finite result ({}, {})",
            point.x, point.y
        )))
    }
}

/// `+proj=utm +zone=19 +ellps=WGS84 +datum=WGS84 +units=m`
pub fn utm_zone_19n() -> TransverseMercator {
    TransverseMercator::utm_zone(WGS84, 19, true)
}

/// `+proj=lcc +lat_1=42.68333333333333 +lat_2=41.71666666666667 +lat_0=41
/// +lon_0=-71.5 +x_0=200000 +y_0=750000 +ellps=GRS80`
pub fn massachusetts_mainland() -> LambertConformalConic {
    LambertConformalConic::new_2sp(
        GRS80,
        (-71.5_f64).to_radians(),
        41.0_f64.to_radians(),
        42.683_333_333_333_33_f64.to_radians(),
        41.716_666_666_666_67_f64.to_radians(),
        200_000.0,
        750_000.0,
    )
}
