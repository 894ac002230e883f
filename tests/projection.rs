use approx::assert_relative_eq;
use assert_matches::assert_matches;

use tileplan::domain::Point;
use tileplan::error::TileplanError;
use tileplan::projection::{Projection, ProjectionEngine, massachusetts_mainland, utm_zone_19n};

#[test]
fn lcc_central_meridian_survives_the_trip_through_utm() {
    let utm = utm_zone_19n();
    let (x, y) = utm
        .forward((-71.5_f64).to_radians(), 42.0_f64.to_radians())
        .unwrap();

    let catalog = ProjectionEngine::massgis()
        .to_catalog(Point::new(x, y))
        .unwrap();
    assert_relative_eq!(catalog.x, 200_000.0, epsilon = 1e-3);
    // About one degree of meridian north of the false origin.
    assert!(catalog.y > 860_500.0 && catalog.y < 861_500.0, "y = {}", catalog.y);
}

#[test]
fn direct_lcc_matches_engine() {
    let lcc = massachusetts_mainland();
    let (lon, lat) = ((-71.8_f64).to_radians(), 42.45_f64.to_radians());
    let (x, y) = lcc.forward(lon, lat).unwrap();

    let (ux, uy) = utm_zone_19n().forward(lon, lat).unwrap();
    let via_engine = ProjectionEngine::massgis()
        .to_catalog(Point::new(ux, uy))
        .unwrap();
    assert_relative_eq!(via_engine.x, x, epsilon = 1e-3);
    assert_relative_eq!(via_engine.y, y, epsilon = 1e-3);
}

#[test]
fn projection_errors_surface_from_the_engine() {
    struct Broken;

    impl Projection for Broken {
        fn forward(&self, _lon: f64, _lat: f64) -> Result<(f64, f64), TileplanError> {
            Err(TileplanError::Projection("broken".to_string()))
        }

        fn inverse(&self, _x: f64, _y: f64) -> Result<(f64, f64), TileplanError> {
            Ok((f64::NAN, f64::NAN))
        }
    }

    let engine = ProjectionEngine::new(Box::new(Broken), Box::new(massachusetts_mainland()));
    let err = engine.to_catalog(Point::new(0.0, 0.0)).unwrap_err();
    assert_matches!(err, TileplanError::Projection(_));

    let engine = ProjectionEngine::new(Box::new(massachusetts_mainland()), Box::new(Broken));
    let err = engine.to_catalog(Point::new(200_000.0, 750_000.0)).unwrap_err();
    assert_matches!(err, TileplanError::Projection(_));
}
