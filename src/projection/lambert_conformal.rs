//! Lambert Conformal Conic with two standard parallels (2SP).

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use crate::error::TileplanError;
use crate::projection::Projection;
use crate::projection::ellipsoid::Ellipsoid;

const MAX_ITERATIONS: usize = 15;
const POLE_EPSILON: f64 = 1e-10;

pub struct LambertConformalConic {
    ellipsoid: Ellipsoid,
    lon0: f64,
    n: f64,
    f_val: f64,
    rho0: f64,
    false_easting: f64,
    false_northing: f64,
}

impl LambertConformalConic {
    pub fn new_2sp(
        ellipsoid: Ellipsoid,
        lon0: f64,
        lat0: f64,
        lat1: f64,
        lat2: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Self {
        let e = ellipsoid.eccentricity();
        let e2 = ellipsoid.e2;

        let m1 = msfn(lat1, e2);
        let m2 = msfn(lat2, e2);
        let t0 = tsfn(lat0, e);
        let t1 = tsfn(lat1, e);
        let t2 = tsfn(lat2, e);

        let n = if (lat1 - lat2).abs() > 1e-10 {
            (m1.ln() - m2.ln()) / (t1.ln() - t2.ln())
        } else {
            lat1.sin()
        };
        let f_val = m1 / (n * t1.powf(n));
        let rho0 = ellipsoid.a * f_val * t0.powf(n);

        Self {
            ellipsoid,
            lon0,
            n,
            f_val,
            rho0,
            false_easting,
            false_northing,
        }
    }
}

impl Projection for LambertConformalConic {
    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), TileplanError> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(TileplanError::Projection(format!(
                "non-finite input ({lon}, {lat})"
            )));
        }
        // The pole opposite the cone apex maps to infinity.
        if (lat * self.n.signum() + FRAC_PI_2).abs() < POLE_EPSILON || lat.abs() > FRAC_PI_2 {
            return Err(TileplanError::Projection(format!(
                "latitude {:.6} is a singular point of the conic projection",
                lat.to_degrees()
            )));
        }

        let e = self.ellipsoid.eccentricity();
        let rho = if (lat.abs() - FRAC_PI_2).abs() < POLE_EPSILON {
            0.0
        } else {
            self.ellipsoid.a * self.f_val * tsfn(lat, e).powf(self.n)
        };
        let theta = self.n * (lon - self.lon0);

        let x = rho * theta.sin() + self.false_easting;
        let y = self.rho0 - rho * theta.cos() + self.false_northing;
        Ok((x, y))
    }

    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64), TileplanError> {
        let mut x_ = x - self.false_easting;
        let mut y_ = self.rho0 - (y - self.false_northing);
        let mut rho = x_.hypot(y_);
        if !rho.is_finite() {
            return Err(TileplanError::Projection(format!(
                "point ({x}, {y}) is outside the conic domain"
            )));
        }
        if self.n < 0.0 {
            rho = -rho;
            x_ = -x_;
            y_ = -y_;
        }

        if rho == 0.0 {
            return Ok((self.lon0, FRAC_PI_2.copysign(self.n)));
        }

        let e = self.ellipsoid.eccentricity();
        let ts = (rho / (self.ellipsoid.a * self.f_val)).powf(1.0 / self.n);
        let lat = phi_from_ts(ts, e)?;
        let lon = self.lon0 + x_.atan2(y_) / self.n;
        Ok((lon, lat))
    }
}

/// cos(phi) / sqrt(1 - e² sin²(phi))
fn msfn(phi: f64, e2: f64) -> f64 {
    let sin_phi = phi.sin();
    phi.cos() / (1.0 - e2 * sin_phi * sin_phi).sqrt()
}

/// Isometric-latitude helper t(phi) from Snyder (15-9).
fn tsfn(phi: f64, e: f64) -> f64 {
    let con = e * phi.sin();
    (FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - con) / (1.0 + con)).powf(e / 2.0)
}

/// Inverts `tsfn` by fixed-point iteration (Snyder 7-9).
fn phi_from_ts(ts: f64, e: f64) -> Result<f64, TileplanError> {
    if !ts.is_finite() || ts < 0.0 {
        return Err(TileplanError::Projection(format!(
            "conic inverse received invalid t = {ts}"
        )));
    }
    let half_e = e / 2.0;
    let mut phi = FRAC_PI_2 - 2.0 * ts.atan();
    for _ in 0..MAX_ITERATIONS {
        let con = e * phi.sin();
        let next = FRAC_PI_2 - 2.0 * (ts * ((1.0 - con) / (1.0 + con)).powf(half_e)).atan();
        let delta = (next - phi).abs();
        phi = next;
        if delta < 1e-14 {
            return Ok(phi);
        }
    }
    Err(TileplanError::Projection(format!(
        "conic inverse did not converge (t = {ts})"
    )))
}
