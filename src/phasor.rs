//! # Phasors and symmetrical components
//!
//! Fault results come back from the engine either per phase (A, B, C) or per
//! sequence (zero, positive, negative). The Fortescue transform converts
//! between the two:
//!
//! - `S0 = (A + B + C) / 3`
//! - `S1 = (A + a·B + a²·C) / 3`
//! - `S2 = (A + a²·B + a·C) / 3`
//!
//! with `a = 1∠120°`. A balanced set therefore has only a positive-sequence
//! component, equal to its phase A value.

use std::f64::consts::PI;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Below this magnitude the angle is reported as zero.
pub const ANGLE_EPSILON: f64 = 1e-6;

const SQRT3_2: f64 = 0.866_025_403_784_438_6;

/// The rotation operator `a = 1∠120°`.
pub const A1: Phasor = Phasor(Complex64::new(-0.5, SQRT3_2));
/// `a² = 1∠240°`.
pub const A2: Phasor = Phasor(Complex64::new(-0.5, -SQRT3_2));

/// A complex quantity shown as magnitude and angle in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Phasor(pub Complex64);

impl Phasor {
    pub const ZERO: Phasor = Phasor(Complex64::new(0.0, 0.0));

    /// Builds a phasor from magnitude and angle in degrees.
    pub fn new(mag: f64, ang_deg: f64) -> Self {
        Phasor(Complex64::from_polar(mag, ang_deg.to_radians()))
    }

    pub fn from_rect(re: f64, im: f64) -> Self {
        Phasor(Complex64::new(re, im))
    }

    pub fn mag(self) -> f64 {
        self.0.norm()
    }

    /// Angle in degrees in (-180, 180]; 0 when the magnitude is negligible.
    pub fn ang(self) -> f64 {
        if self.mag() < ANGLE_EPSILON {
            return 0.0;
        }
        let rad = self.0.arg();
        if rad <= -PI {
            (rad + 2.0 * PI).to_degrees()
        } else {
            rad.to_degrees()
        }
    }

    pub fn re(self) -> f64 {
        self.0.re
    }

    pub fn im(self) -> f64 {
        self.0.im
    }

    pub fn complex(self) -> Complex64 {
        self.0
    }
}

impl From<Complex64> for Phasor {
    fn from(c: Complex64) -> Self {
        Phasor(c)
    }
}

impl fmt::Display for Phasor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}∠{:.1}°", self.mag(), self.ang())
    }
}

impl Add for Phasor {
    type Output = Phasor;
    fn add(self, rhs: Phasor) -> Phasor {
        Phasor(self.0 + rhs.0)
    }
}

impl Sub for Phasor {
    type Output = Phasor;
    fn sub(self, rhs: Phasor) -> Phasor {
        Phasor(self.0 - rhs.0)
    }
}

impl Mul for Phasor {
    type Output = Phasor;
    fn mul(self, rhs: Phasor) -> Phasor {
        Phasor(self.0 * rhs.0)
    }
}

impl Mul<f64> for Phasor {
    type Output = Phasor;
    fn mul(self, rhs: f64) -> Phasor {
        Phasor(self.0 * rhs)
    }
}

impl Div for Phasor {
    type Output = Phasor;
    fn div(self, rhs: Phasor) -> Phasor {
        Phasor(self.0 / rhs.0)
    }
}

impl Div<f64> for Phasor {
    type Output = Phasor;
    fn div(self, rhs: f64) -> Phasor {
        Phasor(self.0 / rhs)
    }
}

impl Neg for Phasor {
    type Output = Phasor;
    fn neg(self) -> Phasor {
        Phasor(-self.0)
    }
}

/// Phase quantities to (zero, positive, negative) sequence.
pub fn phase_to_seq(a: Phasor, b: Phasor, c: Phasor) -> (Phasor, Phasor, Phasor) {
    let s0 = (a + b + c) / 3.0;
    let s1 = (a + A1 * b + A2 * c) / 3.0;
    let s2 = (a + A2 * b + A1 * c) / 3.0;
    (s0, s1, s2)
}

/// Sequence quantities back to phases A, B, C.
pub fn seq_to_phase(s0: Phasor, s1: Phasor, s2: Phasor) -> (Phasor, Phasor, Phasor) {
    let a = s0 + s1 + s2;
    let b = s0 + A2 * s1 + A1 * s2;
    let c = s0 + A1 * s1 + A2 * s2;
    (a, b, c)
}
