//! Decimal input and output for balls.
//!
//! Output follows the `[mid +/- rad]` convention: only digits supported by
//! the radius are printed and the printed radius is rounded up so that it
//! also covers the binary-to-decimal conversion error.

use std::fmt;

use dashu::integer::UBig;
use num_traits::Zero;
use thiserror::Error;

use super::complex::ComplexBall;
use super::dyadic::Dyadic;
use super::mag::Mag;
use super::real::Ball;

const LOG10_2: f64 = std::f64::consts::LOG10_2;
const MAX_DECIMAL_EXPONENT: i64 = 1_000_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseBallError {
    #[error("empty decimal literal")]
    Empty,
    #[error("invalid decimal literal '{0}'")]
    Invalid(String),
    #[error("decimal exponent out of range in '{0}'")]
    ExponentRange(String),
}

fn ten_pow(n: u64) -> UBig {
    UBig::from(10u8).pow(n as usize)
}

impl Ball {
    /// Parses a decimal literal such as `1e-30`, `-0.125` or `42` into a ball
    /// guaranteed to contain the exact decimal value.
    pub fn from_decimal_str(text: &str, prec: u32) -> Result<Ball, ParseBallError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ParseBallError::Empty);
        }
        let invalid = || ParseBallError::Invalid(text.to_string());
        let (negative, body) = match text.as_bytes()[0] {
            b'-' => (true, &text[1..]),
            b'+' => (false, &text[1..]),
            _ => (false, text),
        };
        let (mantissa, exponent) = match body.find(['e', 'E']) {
            Some(pos) => {
                let exp: i64 = body[pos + 1..].parse().map_err(|_| invalid())?;
                (&body[..pos], exp)
            }
            None => (body, 0),
        };
        let (int_part, frac_part) = match mantissa.split_once('.') {
            Some((i, f)) => (i, f),
            None => (mantissa, ""),
        };
        let digits = format!("{int_part}{frac_part}");
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let scale = exponent - frac_part.len() as i64;
        if scale.abs() > MAX_DECIMAL_EXPONENT {
            return Err(ParseBallError::ExponentRange(text.to_string()));
        }
        let value = UBig::from_str_radix(&digits, 10).map_err(|_| invalid())?;
        let ball = if scale >= 0 {
            Ball::exact(Dyadic::from_ubig(value * ten_pow(scale as u64)))
        } else {
            Ball::exact(Dyadic::from_ubig(value))
                .div(&Ball::exact(Dyadic::from_ubig(ten_pow((-scale) as u64))), prec)
        };
        Ok(if negative { ball.neg() } else { ball })
    }

    /// Decimal rendering with at most `digits` significant digits.
    pub fn to_decimal(&self, digits: usize) -> String {
        let digits = digits.max(1) as i64;
        if !self.is_finite() {
            return "[+/- inf]".to_string();
        }
        let mid = self.mid();
        if mid.is_zero() {
            return if self.is_exact() {
                "0".to_string()
            } else {
                format!("[+/- {}]", radius_string(self.rad()))
            };
        }

        let mut lead = (mid.log2_approx() * LOG10_2).floor() as i64;
        let mut count = digits;
        if !self.is_exact() {
            let rad_lead = (self.rad().log2_approx() * LOG10_2).floor() as i64;
            count = count.min(lead - rad_lead);
        }
        if count < 1 {
            return format!("[+/- {}]", radius_string(self.mag()));
        }

        let abs = mid.abs();
        let (scaled, exact) = loop {
            let (scaled, exact) = scale_round(&abs, count - 1 - lead);
            let len = scaled.to_string().len() as i64;
            if len > count {
                lead += 1;
            } else if len < count {
                lead -= 1;
            } else {
                break (scaled, exact);
            }
        };
        let sign = if mid.is_negative() { "-" } else { "" };
        let mut text = scaled.to_string();
        if exact && self.is_exact() {
            let keep = (lead + 1).clamp(1, text.len() as i64) as usize;
            while text.len() > keep && text.ends_with('0') {
                text.pop();
            }
            return format!("{sign}{}", place_point(&text, lead));
        }
        let body = place_point(&text, lead);
        let mut rad = self.rad();
        if !exact {
            rad = rad.add(half_unit(lead - count + 1));
        }
        format!("[{sign}{body} +/- {}]", radius_string(rad))
    }
}

/// `round(x * 10^q)` and whether the product was an integer.
fn scale_round(x: &Dyadic, q: i64) -> (UBig, bool) {
    let mut num = x.mantissa().clone();
    let mut den = UBig::ONE;
    let e = x.exponent();
    if e >= 0 {
        num = num << e as usize;
    } else {
        den = den << (-e) as usize;
    }
    if q >= 0 {
        num = num * ten_pow(q as u64);
    } else {
        den = den * ten_pow((-q) as u64);
    }
    let exact = (&num % &den).is_zero();
    let rounded = ((num << 1) + &den) / (den << 1);
    (rounded, exact)
}

/// Upper bound for `10^k / 2`.
fn half_unit(k: i64) -> Mag {
    let unit = if k >= 0 {
        Mag::from_dyadic(&Dyadic::from_ubig(ten_pow(k as u64)))
    } else {
        Mag::one().div(Mag::from_dyadic_lower(&Dyadic::from_ubig(ten_pow(k.unsigned_abs()))))
    };
    unit.mul_2exp(-1)
}

/// Places the decimal point in a digit string whose first digit has weight
/// `10^lead`.
fn place_point(digits: &str, lead: i64) -> String {
    let n = digits.len() as i64;
    if (0..n).contains(&lead) {
        let split = (lead + 1) as usize;
        let (int, frac) = digits.split_at(split);
        if frac.is_empty() {
            int.to_string()
        } else {
            format!("{int}.{frac}")
        }
    } else if (-4..0).contains(&lead) {
        format!("0.{}{}", "0".repeat((-lead - 1) as usize), digits)
    } else {
        let (first, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{first}e{lead}")
        } else {
            format!("{first}.{rest}e{lead}")
        }
    }
}

/// Three significant digits, rounded up.
fn radius_string(r: Mag) -> String {
    if r.is_zero() {
        return "0".to_string();
    }
    if r.is_inf() {
        return "inf".to_string();
    }
    let l10 = r.log2_approx() * LOG10_2;
    let mut e = l10.floor() as i64;
    let scaled = 10f64.powf(l10 - e as f64) * 100.0;
    let snapped = scaled.round();
    let hundredths = if (scaled - snapped).abs() < 1e-9 {
        snapped
    } else {
        scaled.ceil()
    };
    let mut m = hundredths / 100.0;
    if m >= 10.0 {
        m /= 10.0;
        e += 1;
    }
    format!("{m:.2}e{e}")
}

impl fmt::Display for Ball {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_decimal(f.precision().unwrap_or(17)))
    }
}

impl ComplexBall {
    pub fn to_decimal(&self, digits: usize) -> String {
        if self.is_real() {
            return self.re().to_decimal(digits);
        }
        let im = if self.im().mid().is_negative() {
            self.im().neg()
        } else {
            self.im().clone()
        };
        let im_text = format!("{}*I", im.to_decimal(digits));
        if self.re().is_zero() {
            return if self.im().mid().is_negative() {
                format!("-{im_text}")
            } else {
                im_text
            };
        }
        let op = if self.im().mid().is_negative() { '-' } else { '+' };
        format!("{} {op} {im_text}", self.re().to_decimal(digits))
    }
}

impl fmt::Display for ComplexBall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_decimal(f.precision().unwrap_or(17)))
    }
}
