//! Color channel access (`red`/`green`/`blue`/`alpha`/`hue`/`saturation`/
//! `lightness`/`luma`) and manipulation (`darken`/`lighten`/`saturate`/
//! `desaturate`/`spin`/`fadein`/`fadeout`/`fade`/`tint`/`shade`/`mix`/
//! `contrast`), plus `argb`/`rgbahex`.

use strum::{Display, EnumString};

use crate::color::{self, rgb_to_hsl};
use crate::error::{EvalError, EvalResult};
use crate::value::{clamp_alpha, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ColorFn {
    Red,
    Green,
    Blue,
    Alpha,
    Hue,
    Saturation,
    Lightness,
    Luma,
    Argb,
    Rgbahex,
    Darken,
    Lighten,
    Saturate,
    Desaturate,
    Spin,
    Fadein,
    Fadeout,
    Fade,
    Tint,
    Shade,
    Mix,
    Contrast,
}

fn as_color(v: &Value) -> EvalResult<(f64, f64, f64, f64)> {
    match color::coerce_to_color(v) {
        Some(Value::Color(r, g, b, a)) => Ok((r, g, b, a.unwrap_or(1.0))),
        _ => Err(EvalError::new(crate::error::ErrorKind::ColorCoercion, format!("{} is not a color", v.stringify()))),
    }
}

fn as_percent_or_number(v: &Value) -> EvalResult<f64> {
    match v {
        Value::Number(n, unit) if unit == "%" => Ok(*n / 100.0),
        Value::Number(n, _) => Ok(*n),
        _ => Err(EvalError::argument_mismatch(format!("expected a number, got {}", v.stringify()))),
    }
}

pub fn call(func: ColorFn, args: &[Value]) -> EvalResult<Value> {
    let arg0 = args.first().ok_or_else(|| EvalError::argument_mismatch("missing color argument"))?;
    match func {
        ColorFn::Red => Ok(Value::number(as_color(arg0)?.0, "")),
        ColorFn::Green => Ok(Value::number(as_color(arg0)?.1, "")),
        ColorFn::Blue => Ok(Value::number(as_color(arg0)?.2, "")),
        ColorFn::Alpha => Ok(Value::number(as_color(arg0)?.3, "")),
        ColorFn::Hue => Ok(Value::number(rgb_to_hsl(as_color(arg0)?.0, as_color(arg0)?.1, as_color(arg0)?.2).0, "")),
        ColorFn::Saturation => {
            let (r, g, b, _) = as_color(arg0)?;
            Ok(Value::number(rgb_to_hsl(r, g, b).1 * 100.0, "%"))
        }
        ColorFn::Lightness => {
            let (r, g, b, _) = as_color(arg0)?;
            Ok(Value::number(rgb_to_hsl(r, g, b).2 * 100.0, "%"))
        }
        ColorFn::Luma => {
            let (r, g, b, _) = as_color(arg0)?;
            Ok(Value::number(color::luma(r, g, b) * 100.0, "%"))
        }
        ColorFn::Argb => {
            let (r, g, b, a) = as_color(arg0)?;
            Ok(Value::keyword(color::AARRGGBB(r, g, b, Some(a))))
        }
        ColorFn::Rgbahex => {
            let (r, g, b, a) = as_color(arg0)?;
            Ok(Value::keyword(color::AARRGGBB(r, g, b, Some(a))))
        }
        ColorFn::Darken | ColorFn::Lighten => {
            let (r, g, b, a) = as_color(arg0)?;
            let (h, s, l) = rgb_to_hsl(r, g, b);
            let amount = as_percent_or_number(arg(args, 1)?)?;
            let l2 = if func == ColorFn::Darken { (l - amount).clamp(0.0, 1.0) } else { (l + amount).clamp(0.0, 1.0) };
            let (r2, g2, b2) = color::hsl_to_rgb(h, s, l2);
            Ok(Value::color(r2, g2, b2, Some(a)))
        }
        ColorFn::Saturate | ColorFn::Desaturate => {
            let (r, g, b, a) = as_color(arg0)?;
            let (h, s, l) = rgb_to_hsl(r, g, b);
            let amount = as_percent_or_number(arg(args, 1)?)?;
            let s2 = if func == ColorFn::Saturate { (s + amount).clamp(0.0, 1.0) } else { (s - amount).clamp(0.0, 1.0) };
            let (r2, g2, b2) = color::hsl_to_rgb(h, s2, l);
            Ok(Value::color(r2, g2, b2, Some(a)))
        }
        ColorFn::Spin => {
            let (r, g, b, a) = as_color(arg0)?;
            let (h, s, l) = rgb_to_hsl(r, g, b);
            let (delta, _) = match arg(args, 1)? {
                Value::Number(n, u) => (*n, u.clone()),
                other => return Err(EvalError::argument_mismatch(format!("expected a number, got {}", other.stringify()))),
            };
            let (r2, g2, b2) = color::hsl_to_rgb(h + delta, s, l);
            Ok(Value::color(r2, g2, b2, Some(a)))
        }
        ColorFn::Fadein | ColorFn::Fadeout => {
            let (r, g, b, a) = as_color(arg0)?;
            let amount = as_percent_or_number(arg(args, 1)?)?;
            let a2 = if func == ColorFn::Fadein { clamp_alpha(a + amount) } else { clamp_alpha(a - amount) };
            Ok(Value::color(r, g, b, Some(a2)))
        }
        ColorFn::Fade => {
            let (r, g, b, _) = as_color(arg0)?;
            let amount = as_percent_or_number(arg(args, 1)?)?;
            Ok(Value::color(r, g, b, Some(clamp_alpha(amount))))
        }
        ColorFn::Tint => mix_with(arg0, args, (255.0, 255.0, 255.0, 1.0)),
        ColorFn::Shade => mix_with(arg0, args, (0.0, 0.0, 0.0, 1.0)),
        ColorFn::Mix => {
            let c1 = as_color(arg0)?;
            let c2 = as_color(arg(args, 1)?)?;
            let weight = match args.get(2) {
                Some(v) => as_percent_or_number(v)?,
                None => 0.5,
            };
            Ok(mix_colors(c1, c2, weight))
        }
        ColorFn::Contrast => {
            let color = as_color(arg0)?;
            let dark = match args.get(1) {
                Some(v) => as_color(v)?,
                None => (0.0, 0.0, 0.0, 1.0),
            };
            let light = match args.get(2) {
                Some(v) => as_color(v)?,
                None => (255.0, 255.0, 255.0, 1.0),
            };
            let threshold = match args.get(3) {
                Some(v) => as_percent_or_number(v)?,
                None => 0.43,
            };
            let luma = color::luma(color.0, color.1, color.2);
            let picked = if luma < threshold { light } else { dark };
            Ok(Value::color(picked.0, picked.1, picked.2, Some(picked.3)))
        }
    }
}

fn mix_with(c: &Value, args: &[Value], other: (f64, f64, f64, f64)) -> EvalResult<Value> {
    let base = as_color(c)?;
    let weight = match args.get(1) {
        Some(v) => as_percent_or_number(v)?,
        None => 0.5,
    };
    // weight applies to the tint/shade color itself, not the base: `tint(c,
    // 10%)` is 10% white, per less.js's `mix(white, c, w)` definition.
    Ok(mix_colors(other, base, weight))
}

fn mix_colors(c1: (f64, f64, f64, f64), c2: (f64, f64, f64, f64), weight: f64) -> Value {
    let w = weight.clamp(0.0, 1.0);
    let r = c1.0 * w + c2.0 * (1.0 - w);
    let g = c1.1 * w + c2.1 * (1.0 - w);
    let b = c1.2 * w + c2.2 * (1.0 - w);
    let a = c1.3 * w + c2.3 * (1.0 - w);
    Value::color(r, g, b, Some(a))
}

fn arg(args: &[Value], i: usize) -> EvalResult<&Value> {
    args.get(i).ok_or_else(|| EvalError::argument_mismatch(format!("missing argument {}", i + 1)))
}
