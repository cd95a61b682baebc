/*!
From geographic coordinates to the projected plane of the grid.

The landscape rasters are in an equal-area projection, so that every cell
has the same area and the same carrying capacity. Sites and the origin of the
expansion are given as longitude and latitude and need to be projected before
they can be looked up on the grid.
 */

use std::f64::consts::PI;

use serde_derive::{Deserialize, Serialize};

/// Parameters of an ellipsoidal Albers equal-area conic projection, angles
/// in degrees, lengths in metres.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Albers {
    pub standard_parallel_1: f64,
    pub standard_parallel_2: f64,
    pub latitude_of_origin: f64,
    pub central_meridian: f64,
    pub semi_major_axis: f64,
    pub inverse_flattening: f64,
    pub false_easting: f64,
    pub false_northing: f64,
}

impl Albers {
    /// South America Albers Equal Area Conic, on the Australian National and
    /// South American 1969 ellipsoid.
    pub fn south_america() -> Self {
        Albers {
            standard_parallel_1: -5.,
            standard_parallel_2: -42.,
            latitude_of_origin: -32.,
            central_meridian: -60.,
            semi_major_axis: 6_378_160.,
            inverse_flattening: 298.25,
            false_easting: 0.,
            false_northing: 0.,
        }
    }

    fn eccentricity(&self) -> f64 {
        let f = 1. / self.inverse_flattening;
        (f * (2. - f)).sqrt()
    }

    // Snyder (1987), eqs. 3-12 and 14-15
    fn q(&self, phi: f64) -> f64 {
        let e = self.eccentricity();
        let s = phi.sin();
        let es = e * s;
        (1. - e * e) * (s / (1. - es * es) - (1. / (2. * e)) * ((1. - es) / (1. + es)).ln())
    }

    fn m(&self, phi: f64) -> f64 {
        let e = self.eccentricity();
        let s = phi.sin();
        phi.cos() / (1. - e * e * s * s).sqrt()
    }

    pub fn forward(&self, longitude: f64, latitude: f64) -> (f64, f64) {
        let to_rad = PI / 180.;
        let phi1 = self.standard_parallel_1 * to_rad;
        let phi2 = self.standard_parallel_2 * to_rad;
        let phi0 = self.latitude_of_origin * to_rad;

        let (m1, m2) = (self.m(phi1), self.m(phi2));
        let (q1, q2) = (self.q(phi1), self.q(phi2));
        let n = (m1 * m1 - m2 * m2) / (q2 - q1);
        let c = m1 * m1 + n * q1;
        let a = self.semi_major_axis;
        let rho = |phi: f64| a * (c - n * self.q(phi)).sqrt() / n;

        let theta = n * (longitude - self.central_meridian) * to_rad;
        let r = rho(latitude * to_rad);
        (
            self.false_easting + r * theta.sin(),
            self.false_northing + rho(phi0) - r * theta.cos(),
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Projection {
    /// Coordinates are already in the grid's projected system.
    Identity,
    Albers(Albers),
}

impl Default for Projection {
    fn default() -> Self {
        Projection::Albers(Albers::south_america())
    }
}

impl Projection {
    pub fn forward(&self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Projection::Identity => (x, y),
            Projection::Albers(albers) => albers.forward(x, y),
        }
    }
}

pub fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - b.0).hypot(a.1 - b.1)
}
