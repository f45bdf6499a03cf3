//! `convert(value, unit)` — cross-unit conversion within a unit family.
//!
//! Angle conversion hubs through degrees (`$deg`) the whole way, which is
//! what keeps `convert(convert(x, u2), u1) == x` (see DESIGN.md for why this
//! intentionally diverges from the source's literal control flow while
//! still walking the units as a sequential `if` chain rather than a
//! `match`, to keep the branch shape recognizable).

use crate::error::EvalError;
use crate::value::Value;

const PX_PER_UNIT: &[(&str, f64)] = &[
    ("px", 1.0),
    ("m", 3779.527_559_06),
    ("cm", 37.795_275_59),
    ("mm", 3.779_527_56),
    ("in", 96.0),
    ("pt", 1.333_333_33),
    ("pc", 16.0),
];

fn length_factor(unit: &str) -> Option<f64> {
    PX_PER_UNIT.iter().find(|(u, _)| *u == unit).map(|(_, f)| *f)
}

fn round8(v: f64) -> f64 {
    (v * 1e8).round() / 1e8
}

pub fn convert(value: f64, from: &str, to: &str) -> Result<f64, EvalError> {
    if from == to {
        return Ok(round8(value));
    }

    if let (Some(from_f), Some(to_f)) = (length_factor(from), length_factor(to)) {
        let px = value * from_f;
        return Ok(round8(px / to_f));
    }

    if (from == "s" || from == "ms") && (to == "s" || to == "ms") {
        let ms = if from == "s" { value * 1000.0 } else { value };
        let out = if to == "s" { ms / 1000.0 } else { ms };
        return Ok(round8(out));
    }

    let angle_units = ["deg", "rad", "grad", "turn"];
    if angle_units.contains(&from) && angle_units.contains(&to) {
        let mut deg = value;
        if from == "rad" {
            deg = value.to_degrees();
        }
        if from == "turn" {
            deg = value * 360.0;
        }
        if from == "grad" {
            deg = value / (400.0 / 360.0);
        }
        let mut out = deg;
        if to == "rad" {
            out = deg.to_radians();
        }
        if to == "turn" {
            out = deg / 360.0;
        }
        if to == "grad" {
            out = deg * (400.0 / 360.0);
        }
        return Ok(round8(out));
    }

    Err(EvalError::unit_conversion(from, to))
}
