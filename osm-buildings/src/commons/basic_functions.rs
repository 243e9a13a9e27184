use log::warn;
use std::path::{Path, PathBuf};

use crate::collect::global_variables::{FEET_TO_METERS, OSM_SUFFIXES, OUTPUT_EXTENSION};

/// Convert a free-form OSM `height` value to meters
///
/// Accepted forms: `12`, `12.5 m`, `40ft`, `5'6"`. Words such as `yes` or
/// `unknown` mean "no data" and give 0. The result is always finite and
/// non-negative: anything that cannot be read is logged and becomes 0.
///
/// The unit checks run in a fixed order: `ft`, then `m`, then the
/// feet-and-inches form. The last branch is taken whenever neither suffix
/// matched, whether or not a quote is present, so a bare string like `~12`
/// is read as feet (and fails on the `~`).
pub fn parse_height(given: &str) -> f64 {
    let given = given.trim();
    if given.is_empty() {
        warn!("Empty height value, using 0");
        return 0.0;
    }

    if let Ok(n) = given.parse::<f64>() {
        return non_negative(n, given);
    }

    // Words carry no height
    match given.chars().next() {
        Some(c) if c.is_alphabetic() => return 0.0,
        _ => {}
    }

    let mut meters = true;
    let mut accumulated: Option<f64> = None;
    let mut feet_only = false;
    let mut remainder: &str = given;

    if let Some(idx) = remainder.find("ft") {
        meters = false;
        remainder = &remainder[..idx];
    } else if let Some(idx) = remainder.find('m') {
        remainder = &remainder[..idx];
    } else {
        meters = false;
        if let Some(idx) = remainder.find('\'').filter(|&i| i > 0) {
            match remainder[..idx].trim().parse::<f64>() {
                Ok(feet) => {
                    accumulated = Some(feet);
                    feet_only = true;
                }
                Err(_) => {
                    warn!("{} couldn't be parsed (feet part)", given);
                    return 0.0;
                }
            }
            remainder = &remainder[idx + 1..];
        }
        if let Some(idx) = remainder.find('"').filter(|&i| i > 0) {
            match remainder[..idx].trim().parse::<f64>() {
                Ok(inches) => {
                    accumulated = Some(accumulated.unwrap_or(0.0) + inches / 12.0);
                    feet_only = false;
                }
                Err(_) => {
                    warn!("{} couldn't be parsed (inches part)", given);
                    return 0.0;
                }
            }
            remainder = &remainder[idx + 1..];
        }
    }

    let token = remainder.trim().split(' ').next().unwrap_or("");
    // After a bare feet mark the trailing number is inches: 5'6 is 5.5 ft
    let n = match (token.parse::<f64>(), accumulated) {
        (Ok(inches), Some(acc)) if feet_only => acc + inches / 12.0,
        (Ok(value), _) => value,
        (Err(_), Some(acc)) if token.is_empty() => acc,
        _ => {
            warn!("{} couldn't be parsed", given);
            return 0.0;
        }
    };

    if meters {
        non_negative(n, given)
    } else {
        non_negative(n * FEET_TO_METERS, given)
    }
}

fn non_negative(n: f64, given: &str) -> f64 {
    if n.is_finite() && n >= 0.0 {
        n
    } else {
        warn!("Height {} is not a usable length, using 0", given);
        0.0
    }
}

/// Default output path for an input extract
/// `city.osm.pbf` and `city.osm` both become `city.geojson`; any other name
/// gets the extension appended.
pub fn derive_output_path(input: &Path) -> PathBuf {
    let as_str = input.to_string_lossy();
    for suffix in OSM_SUFFIXES {
        if let Some(stem) = as_str.strip_suffix(suffix) {
            return PathBuf::from(format!("{}{}", stem, OUTPUT_EXTENSION));
        }
    }
    PathBuf::from(format!("{}{}", as_str, OUTPUT_EXTENSION))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_parse_height_bare_number() {
        assert_eq!(parse_height("12"), 12.0);
        assert_eq!(parse_height("12.5"), 12.5);
        assert_eq!(parse_height(" 7 "), 7.0);
    }

    #[test]
    fn test_parse_height_units() {
        assert_eq!(parse_height("12m"), 12.0);
        assert_eq!(parse_height("12 m"), 12.0);
        assert!(close(parse_height("40ft"), 40.0 * 0.3048));
        assert!(close(parse_height("40 ft"), 12.192));
    }

    #[test]
    fn test_parse_height_feet_and_inches() {
        assert!(close(parse_height("5'6\""), 5.5 * 0.3048));
        assert!(close(parse_height("5' 6\""), 1.6764));
        assert!(close(parse_height("10'"), 3.048));
        // Inch mark left out
        assert!(close(parse_height("5'6"), 1.6764));
        assert!(close(parse_height("5' 6"), 1.6764));
    }

    #[test]
    fn test_parse_height_no_data() {
        assert_eq!(parse_height("unknown"), 0.0);
        assert_eq!(parse_height("Yes"), 0.0);
        assert_eq!(parse_height(""), 0.0);
        assert_eq!(parse_height("   "), 0.0);
    }

    #[test]
    fn test_parse_height_garbage_is_zero() {
        // No suffix matched, so this falls into the feet branch and fails
        assert_eq!(parse_height("~12"), 0.0);
        assert_eq!(parse_height("12,5"), 0.0);
        assert_eq!(parse_height("-"), 0.0);
    }

    #[test]
    fn test_parse_height_never_negative() {
        for s in ["-5", "-0.5", "0", "3.2", "1e3", "-2m", "-3ft"] {
            let h = parse_height(s);
            assert!(h.is_finite() && h >= 0.0, "{} -> {}", s, h);
        }
    }

    #[test]
    fn test_derive_output_path() {
        assert_eq!(
            derive_output_path(Path::new("data/mumbai.osm.pbf")),
            PathBuf::from("data/mumbai.geojson")
        );
        assert_eq!(
            derive_output_path(Path::new("delhi.osm")),
            PathBuf::from("delhi.geojson")
        );
        assert_eq!(
            derive_output_path(Path::new("extract.pbf")),
            PathBuf::from("extract.pbf.geojson")
        );
    }
}
