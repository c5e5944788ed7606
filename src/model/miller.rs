// src/model/miller.rs
use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer (h, k, l) triple. User input may be non-coprime; resolver output is canonical.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MillerIndex {
    pub h: i32,
    pub k: i32,
    pub l: i32,
}

impl MillerIndex {
    pub const ZERO: MillerIndex = MillerIndex { h: 0, k: 0, l: 0 };

    pub fn new(h: i32, k: i32, l: i32) -> Self {
        Self { h, k, l }
    }

    pub fn is_zero(&self) -> bool {
        self.h == 0 && self.k == 0 && self.l == 0
    }

    pub fn negate(&self) -> Self {
        Self::new(-self.h, -self.k, -self.l)
    }

    /// Smallest coprime triple with the first nonzero component positive.
    pub fn canonical(&self) -> Self {
        match reduce([self.h as i64, self.k as i64, self.l as i64]) {
            Some([h, k, l]) => Self::new(h as i32, k as i32, l as i32),
            None => Self::ZERO,
        }
    }
}

impl fmt::Display for MillerIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.h, self.k, self.l)
    }
}

pub fn gcd(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a.abs(), b.abs());
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// Divide by the pairwise GCD and flip so the first nonzero entry is positive.
/// `None` when all three are zero.
pub fn reduce(v: [i64; 3]) -> Option<[i64; 3]> {
    let g = gcd(gcd(v[0], v[1]), v[2]);
    if g == 0 {
        return None;
    }
    let mut out = [v[0] / g, v[1] / g, v[2] / g];
    let first = out.iter().copied().find(|c| *c != 0).unwrap_or(0);
    if first < 0 {
        out = [-out[0], -out[1], -out[2]];
    }
    Some(out)
}
