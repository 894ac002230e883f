//! Transverse Mercator (Krüger n-series, 6th order), the projection under
//! every UTM zone.

use std::f64::consts::{FRAC_PI_2, PI};

use crate::error::TileplanError;
use crate::projection::Projection;
use crate::projection::ellipsoid::Ellipsoid;

const MAX_ITERATIONS: usize = 15;

pub struct TransverseMercator {
    ellipsoid: Ellipsoid,
    lon0: f64,
    k0: f64,
    false_easting: f64,
    false_northing: f64,
    a_hat: f64,
    alpha: [f64; 6],
    beta: [f64; 6],
    xi0: f64,
}

impl TransverseMercator {
    pub fn new(
        ellipsoid: Ellipsoid,
        lon0: f64,
        lat0: f64,
        k0: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Self {
        let n = ellipsoid.n;
        let n2 = n * n;
        let n3 = n2 * n;
        let n4 = n3 * n;
        let n5 = n4 * n;
        let n6 = n5 * n;

        Self {
            ellipsoid,
            lon0,
            k0,
            false_easting,
            false_northing,
            a_hat: ellipsoid.a / (1.0 + n) * (1.0 + n2 / 4.0 + n4 / 64.0),
            alpha: alpha_coefficients(n, n2, n3, n4, n5, n6),
            beta: beta_coefficients(n, n2, n3, n4, n5, n6),
            xi0: meridional_arc_normalized(lat0, n),
        }
    }

    pub fn utm_zone(ellipsoid: Ellipsoid, zone: u8, north: bool) -> Self {
        let lon0 = (f64::from(zone) * 6.0 - 183.0).to_radians();
        let false_northing = if north { 0.0 } else { 10_000_000.0 };
        Self::new(ellipsoid, lon0, 0.0, 0.9996, 500_000.0, false_northing)
    }

    fn tau_to_tau_prime(&self, tau: f64) -> f64 {
        let e = self.ellipsoid.eccentricity();
        let tau1 = tau.hypot(1.0);
        let sigma = (e * (e * tau / tau1).atanh()).sinh();
        tau * sigma.hypot(1.0) - sigma * tau1
    }

    /// Newton iteration from conformal tangent back to geodetic tangent.
    fn tau_prime_to_tau(&self, tau_prime: f64) -> Result<f64, TileplanError> {
        let e2 = self.ellipsoid.e2;
        let mut tau = tau_prime;
        for _ in 0..MAX_ITERATIONS {
            let tau1 = tau.hypot(1.0);
            let tau_prime_est = self.tau_to_tau_prime(tau);
            let dtau = (tau_prime - tau_prime_est) * (1.0 + (1.0 - e2) * tau * tau)
                / ((1.0 - e2) * tau1 * tau_prime_est.hypot(1.0));
            tau += dtau;
            if !tau.is_finite() {
                break;
            }
            if dtau.abs() < 1e-12 * (1.0 + tau.abs()) {
                return Ok(tau);
            }
        }
        Err(TileplanError::Projection(format!(
            "transverse mercator inverse did not converge (tau' = {tau_prime})"
        )))
    }
}

impl Projection for TransverseMercator {
    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), TileplanError> {
        if !lat.is_finite() || lat.abs() > FRAC_PI_2 {
            return Err(TileplanError::Projection(format!(
                "latitude {:.6} is out of range",
                lat.to_degrees()
            )));
        }
        let dlam = normalize_longitude(lon - self.lon0);
        if dlam.abs() >= FRAC_PI_2 {
            return Err(TileplanError::Projection(format!(
                "longitude {:.6} is 90 degrees or more from the central meridian",
                lon.to_degrees()
            )));
        }

        let tau_prime = self.tau_to_tau_prime(lat.tan());
        let xi_prime = tau_prime.atan2(dlam.cos());
        let eta_prime = (dlam.sin() / tau_prime.hypot(dlam.cos())).asinh();

        let mut xi = xi_prime;
        let mut eta = eta_prime;
        for (j, &a) in self.alpha.iter().enumerate() {
            let k = 2.0 * (j as f64 + 1.0);
            xi += a * (k * xi_prime).sin() * (k * eta_prime).cosh();
            eta += a * (k * xi_prime).cos() * (k * eta_prime).sinh();
        }

        let x = self.k0 * self.a_hat * eta + self.false_easting;
        let y = self.k0 * self.a_hat * (xi - self.xi0) + self.false_northing;
        Ok((x, y))
    }

    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64), TileplanError> {
        let eta = (x - self.false_easting) / (self.k0 * self.a_hat);
        let xi = (y - self.false_northing) / (self.k0 * self.a_hat) + self.xi0;
        if !eta.is_finite() || !xi.is_finite() || xi.abs() > PI {
            return Err(TileplanError::Projection(format!(
                "point ({x}, {y}) is outside the transverse mercator domain"
            )));
        }

        let mut xi_prime = xi;
        let mut eta_prime = eta;
        for (j, &b) in self.beta.iter().enumerate() {
            let k = 2.0 * (j as f64 + 1.0);
            xi_prime -= b * (k * xi).sin() * (k * eta).cosh();
            eta_prime -= b * (k * xi).cos() * (k * eta).sinh();
        }

        let sinh_eta = eta_prime.sinh();
        let cos_xi = xi_prime.cos();
        let tau_prime = xi_prime.sin() / sinh_eta.hypot(cos_xi);
        let tau = self.tau_prime_to_tau(tau_prime)?;

        Ok((self.lon0 + sinh_eta.atan2(cos_xi), tau.atan()))
    }
}

fn normalize_longitude(lon: f64) -> f64 {
    let mut lon = lon % (2.0 * PI);
    if lon > PI {
        lon -= 2.0 * PI;
    } else if lon < -PI {
        lon += 2.0 * PI;
    }
    lon
}

fn alpha_coefficients(n: f64, n2: f64, n3: f64, n4: f64, n5: f64, n6: f64) -> [f64; 6] {
    [
        n / 2.0 - 2.0 / 3.0 * n2 + 5.0 / 16.0 * n3 + 41.0 / 180.0 * n4 - 127.0 / 288.0 * n5
            + 7891.0 / 37800.0 * n6,
        13.0 / 48.0 * n2 - 3.0 / 5.0 * n3 + 557.0 / 1440.0 * n4 + 281.0 / 630.0 * n5
            - 1983433.0 / 1935360.0 * n6,
        61.0 / 240.0 * n3 - 103.0 / 140.0 * n4 + 15061.0 / 26880.0 * n5
            + 167603.0 / 181440.0 * n6,
        49561.0 / 161280.0 * n4 - 179.0 / 168.0 * n5 + 6601661.0 / 7257600.0 * n6,
        34729.0 / 80640.0 * n5 - 3418889.0 / 1995840.0 * n6,
        212378941.0 / 319334400.0 * n6,
    ]
}

fn beta_coefficients(n: f64, n2: f64, n3: f64, n4: f64, n5: f64, n6: f64) -> [f64; 6] {
    [
        n / 2.0 - 2.0 / 3.0 * n2 + 37.0 / 96.0 * n3 - 1.0 / 360.0 * n4 - 81.0 / 512.0 * n5
            + 96199.0 / 604800.0 * n6,
        1.0 / 48.0 * n2 + 1.0 / 15.0 * n3 - 437.0 / 1440.0 * n4 + 46.0 / 105.0 * n5
            - 1118711.0 / 3870720.0 * n6,
        17.0 / 480.0 * n3 - 37.0 / 840.0 * n4 - 209.0 / 4480.0 * n5 + 5569.0 / 90720.0 * n6,
        4397.0 / 161280.0 * n4 - 11.0 / 504.0 * n5 - 830251.0 / 7257600.0 * n6,
        4583.0 / 161280.0 * n5 - 108847.0 / 3991680.0 * n6,
        20648693.0 / 638668800.0 * n6,
    ]
}

/// Meridional arc from the equator to `phi`, in units of the rectifying radius.
fn meridional_arc_normalized(phi: f64, n: f64) -> f64 {
    let n2 = n * n;
    let n3 = n2 * n;
    let n4 = n3 * n;

    let a2 = -3.0 / 2.0 * n + 9.0 / 16.0 * n3;
    let a4 = 15.0 / 16.0 * n2 - 15.0 / 32.0 * n4;
    let a6 = -35.0 / 48.0 * n3;
    let a8 = 315.0 / 512.0 * n4;

    phi + a2 * (2.0 * phi).sin() + a4 * (4.0 * phi).sin() + a6 * (6.0 * phi).sin()
        + a8 * (8.0 * phi).sin()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use assert_matches::assert_matches;

    use super::*;
    use crate::projection::ellipsoid::WGS84;

    #[test]
    fn roundtrip_zone_19() {
        let tm = TransverseMercator::utm_zone(WGS84, 19, true);
        let cases: &[(f64, f64)] = &[
            (-69.0, 42.0),
            (-71.8, 42.4),
            (-72.0, 41.0),
            (-66.5, 45.0),
            (-69.0, 0.0),
        ];
        for &(lon_deg, lat_deg) in cases {
            let lon = lon_deg.to_radians();
            let lat = lat_deg.to_radians();
            let (x, y) = tm.forward(lon, lat).unwrap();
            let (lon2, lat2) = tm.inverse(x, y).unwrap();
            assert_relative_eq!(lon2, lon, epsilon = 1e-9);
            assert_relative_eq!(lat2, lat, epsilon = 1e-9);
        }
    }

    #[test]
    fn central_meridian_easting() {
        let tm = TransverseMercator::utm_zone(WGS84, 19, true);
        assert_relative_eq!(tm.lon0, (-69.0_f64).to_radians(), epsilon = 1e-12);
        let (x, y) = tm.forward((-69.0_f64).to_radians(), 0.0).unwrap();
        assert_relative_eq!(x, 500_000.0, epsilon = 1e-6);
        assert_relative_eq!(y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn known_northing_on_central_meridian() {
        // 0.9996 * meridian arc to 42N on WGS84.
        let tm = TransverseMercator::utm_zone(WGS84, 19, true);
        let (x, y) = tm
            .forward((-69.0_f64).to_radians(), 42.0_f64.to_radians())
            .unwrap();
        assert_relative_eq!(x, 500_000.0, epsilon = 1e-6);
        assert_relative_eq!(y, 4_649_776.22, epsilon = 1e-2);
    }

    #[test]
    fn far_longitude_is_rejected() {
        let tm = TransverseMercator::utm_zone(WGS84, 19, true);
        let err = tm.forward(30.0_f64.to_radians(), 42.0_f64.to_radians()).unwrap_err();
        assert_matches!(err, TileplanError::Projection(_));
    }

    #[test]
    fn non_finite_inverse_is_rejected() {
        let tm = TransverseMercator::utm_zone(WGS84, 19, true);
        let err = tm.inverse(f64::NAN, 4_700_000.0).unwrap_err();
        assert_matches!(err, TileplanError::Projection(_));
    }
}
