//! Field-level validation shared by the input types in [`schema`](crate::schema).

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static ITN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{10}(\d{2})?$").unwrap());
static PSRN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{13}$").unwrap());
static VIN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-HJ-NPR-Z0-9]{17}$").unwrap());

/// Check that `value` has between `min` and `max` characters, inclusive.
pub fn length(field: &'static str, value: &str, min: usize, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len < min {
        return Err(Error::invalid(
            field,
            format!("must be at least {min} characters long"),
        ));
    }
    if len > max {
        return Err(Error::invalid(
            field,
            format!("must be at most {max} characters long"),
        ));
    }
    Ok(())
}

/// Check the length of an optional value, if it is present.
pub fn optional_length(field: &'static str, value: Option<&str>, max: usize) -> Result<()> {
    match value {
        Some(value) => length(field, value, 0, max),
        None => Ok(()),
    }
}

pub fn longitude(value: Option<f64>) -> Result<()> {
    coordinate("lon", value, 180.)
}

pub fn latitude(value: Option<f64>) -> Result<()> {
    coordinate("lat", value, 90.)
}

fn coordinate(field: &'static str, value: Option<f64>, bound: f64) -> Result<()> {
    match value {
        Some(v) if !(-bound..=bound).contains(&v) => Err(Error::invalid(
            field,
            format!("must be between -{bound} and {bound}"),
        )),
        _ => Ok(()),
    }
}

/// Taxpayer identification number: 10 digits for companies, 12 for individuals.
pub fn itn(value: &str) -> Result<()> {
    if ITN.is_match(value) {
        Ok(())
    } else {
        Err(Error::invalid("itn", "must consist of 10 or 12 digits"))
    }
}

/// Primary state registration number: exactly 13 digits.
pub fn psrn(value: &str) -> Result<()> {
    if PSRN.is_match(value) {
        Ok(())
    } else {
        Err(Error::invalid("psrn", "must consist of 13 digits"))
    }
}

/// Round a price to cents and check that it fits in `numeric(10, 2)`.
///
/// Halves round away from zero, on the decimal digits of the shortest representation of
/// `value`, so `1.005` becomes `1.01`.
pub fn price(value: f64) -> Result<f64> {
    if !value.is_finite() {
        return Err(Error::invalid("price", "must be a finite number"));
    }
    match round_to_cents(value.abs()) {
        Some(cents) if cents < 10_000_000_000 => Ok(value.signum() * cents as f64 / 100.),
        _ => Err(Error::invalid(
            "price",
            "must have at most 8 digits before the decimal point",
        )),
    }
}

/// `value` in whole cents, or `None` if it does not fit in a `u64`.
fn round_to_cents(value: f64) -> Option<u64> {
    // Display never uses exponent notation for f64.
    let repr = value.to_string();
    let (whole, frac) = repr.split_once('.').unwrap_or((repr.as_str(), ""));
    let whole: u64 = whole.parse().ok()?;
    let mut digits = frac
        .bytes()
        .map(|b| u64::from(b - b'0'))
        .chain(std::iter::repeat(0));
    let cents = digits.next()? * 10 + digits.next()?;
    let round_up = digits.next()? >= 5;
    whole
        .checked_mul(100)?
        .checked_add(cents + u64::from(round_up))
}

fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Normalize and validate a vehicle identification number.
pub fn vin(value: &str) -> Result<String> {
    let vin = normalize(value);
    if VIN.is_match(&vin) {
        Ok(vin)
    } else {
        Err(Error::invalid(
            "vin",
            "must be exactly 17 digits or capital Latin letters, excluding I, O and Q",
        ))
    }
}

/// Letters allowed on Russian plates: Cyrillic letters and their Latin look-alikes.
const PLATE_LETTERS: &str = "АВЕКМНОРСТУХABEKMHOPCTYX";

#[derive(Clone, Copy, Debug)]
enum Part {
    /// `n` plate letters.
    Letters(usize),
    /// `n` digits, not all zero.
    Serial(usize),
    /// Region code: 2 or 3 trailing digits.
    Region,
    /// A fixed character.
    Lit(char),
}

const PLATE_FORMATS: &[(&str, &[Part])] = {
    use Part::*;
    &[
        ("standard", &[Letters(1), Serial(3), Letters(2), Region]),
        ("taxi", &[Letters(2), Serial(3), Region]),
        ("motorcycle", &[Serial(4), Letters(2), Region]),
        ("transit", &[Letters(2), Serial(3), Letters(1), Region]),
        ("temporary", &[Lit('Т'), Letters(2), Serial(3), Region]),
        ("diplomatic", &[Serial(3), Letters(2), Region]),
    ]
};

fn matches_plate(mut s: &[char], format: &[Part]) -> bool {
    for part in format {
        match *part {
            Part::Letters(n) => {
                if s.len() < n || !s[..n].iter().all(|c| PLATE_LETTERS.contains(*c)) {
                    return false;
                }
                s = &s[n..];
            }
            Part::Serial(n) => {
                if s.len() < n
                    || !s[..n].iter().all(char::is_ascii_digit)
                    || s[..n].iter().all(|c| *c == '0')
                {
                    return false;
                }
                s = &s[n..];
            }
            Part::Region => {
                return (2..=3).contains(&s.len()) && s.iter().all(char::is_ascii_digit);
            }
            Part::Lit(c) => {
                if s.first() != Some(&c) {
                    return false;
                }
                s = &s[1..];
            }
        }
    }
    s.is_empty()
}

/// Normalize and validate a Russian vehicle registration plate.
pub fn state_number(value: &str) -> Result<String> {
    let number = normalize(value);
    let chars = number.chars().collect::<Vec<_>>();
    if !(8..=12).contains(&chars.len()) {
        return Err(Error::invalid(
            "state_number",
            "must be between 8 and 12 characters long",
        ));
    }
    match PLATE_FORMATS
        .iter()
        .find(|(_, format)| matches_plate(&chars, format))
    {
        Some((kind, _)) => {
            tracing::debug!("{number} is a {kind} plate");
            Ok(number)
        }
        None => Err(Error::invalid(
            "state_number",
            "does not match any registration plate format",
        )),
    }
}
