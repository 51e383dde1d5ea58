//! # NMEA GGA parser
//!
//! Only the fix data sentence (GGA) is used, from either a GPS-only (`$GPGGA`) or multi
//! constellation (`$GNGGA`) receiver. Parsing never fails: anything unusable becomes a fix with
//! `fix = false`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::gps::Fix;
use log::debug;
use util::maths::round_dp;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Sentence prefixes carrying fix data.
pub const GGA_PREFIXES: [&str; 2] = ["$GPGGA", "$GNGGA"];

/// Minimum number of comma separated fields in a usable GGA sentence.
const MIN_GGA_FIELDS: usize = 10;

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Returns true if `line` is a GGA sentence.
pub fn is_gga(line: &str) -> bool {
    GGA_PREFIXES.iter().any(|p| line.starts_with(p))
}

/// Parse a GGA sentence into a fix.
///
/// Field layout (0 indexed): 2/3 latitude `DDMM.MMMM` and hemisphere, 4/5 longitude `DDDMM.MMMM`
/// and hemisphere, 6 fix quality, 7 satellites in use, 9 altitude above mean sea level.
pub fn parse_gga(line: &str) -> Fix {
    let parts: Vec<&str> = line.trim().split(',').collect();

    if parts.len() < MIN_GGA_FIELDS || parts[6] == "0" {
        return Fix::no_fix();
    }

    match parse_fields(&parts) {
        Some(fix) => fix,
        None => {
            debug!("GPS parse error in sentence {:?}", line);
            Fix::no_fix()
        }
    }
}

/// XOR checksum of the characters between `$` and `*`.
pub fn nmea_checksum(body: &str) -> u8 {
    body.bytes().fold(0, |acc, b| acc ^ b)
}

/// Wrap a sentence body (without `$`) into a complete sentence with checksum and line ending.
pub fn format_sentence(body: &str) -> String {
    format!("${}*{:02X}\r\n", body, nmea_checksum(body))
}

/// Format a signed coordinate as NMEA `(D)DDMM.MMMM` plus hemisphere.
pub fn format_coordinate(value: f64, deg_digits: usize, pos: char, neg: char) -> (String, char) {
    let hemi = if value < 0.0 { neg } else { pos };
    let value = value.abs();
    let deg = value.trunc();
    let min = (value - deg) * 60.0;

    (
        format!("{:0width$}{:07.4}", deg as u32, min, width = deg_digits),
        hemi
    )
}

fn parse_fields(parts: &[&str]) -> Option<Fix> {
    let lat = parse_coordinate(parts[2], 2, parts[3] == "S")?;
    let lon = parse_coordinate(parts[4], 3, parts[5] == "W")?;

    let alt = match parts[9] {
        "" => 0.0,
        s => s.parse::<f64>().ok()?,
    };
    let satellites = match parts[7] {
        "" => 0,
        s => s.parse::<u32>().ok()?,
    };

    Some(Fix {
        lat: round_dp(lat, 6),
        lon: round_dp(lon, 6),
        alt: round_dp(alt, 1),
        satellites,
        fix: true,
    })
}

/// Parse a `(D)DDMM.MMMM` coordinate with `deg_digits` leading degree characters.
fn parse_coordinate(raw: &str, deg_digits: usize, negate: bool) -> Option<f64> {
    if raw.is_empty() {
        return None;
    }

    let deg: f64 = raw.get(..deg_digits)?.parse().ok()?;
    let min: f64 = raw.get(deg_digits..)?.parse().ok()?;
    let value = deg + min / 60.0;

    Some(if negate { -value } else { value })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_gpgga() {
        let fix = parse_gga("$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47");

        assert!(fix.fix);
        assert_eq!(fix.lat, 48.1173);
        assert_eq!(fix.lon, 11.516667);
        assert_eq!(fix.alt, 545.4);
        assert_eq!(fix.satellites, 8);
    }

    #[test]
    fn test_parse_southern_western() {
        let fix = parse_gga("$GNGGA,000000,3351.000,S,15112.600,W,1,10,1.0,10.24,M,,M,,*00\r\n");

        assert!(fix.fix);
        assert_eq!(fix.lat, -33.85);
        assert_eq!(fix.lon, -151.21);
        assert_eq!(fix.alt, 10.2);
        assert_eq!(fix.satellites, 10);
    }

    #[test]
    fn test_no_fix_quality() {
        let fix = parse_gga("$GPGGA,123519,4807.038,N,01131.000,E,0,08,0.9,545.4,M,46.9,M,,*46");
        assert_eq!(fix, Fix::no_fix());
        assert!(fix.position().is_none());
    }

    #[test]
    fn test_short_sentence() {
        assert_eq!(parse_gga("$GPGGA,123519,4807.038,N"), Fix::no_fix());
    }

    #[test]
    fn test_empty_fields() {
        // Empty coordinates give no fix
        assert!(!parse_gga("$GPGGA,123519,,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47").fix);
        assert!(!parse_gga("$GPGGA,123519,4807.038,N,,E,1,08,0.9,545.4,M,46.9,M,,*47").fix);

        // Empty altitude and satellites default to zero
        let fix = parse_gga("$GPGGA,123519,4807.038,N,01131.000,E,1,,0.9,,M,46.9,M,,*47");
        assert!(fix.fix);
        assert_eq!(fix.alt, 0.0);
        assert_eq!(fix.satellites, 0);
    }

    #[test]
    fn test_garbage_fields() {
        assert!(!parse_gga("$GPGGA,123519,48x7.038,N,01131.000,E,1,08,0.9,545.4,M,,M,,*47").fix);
        assert!(!parse_gga("$GPGGA,123519,4,N,01131.000,E,1,08,0.9,545.4,M,,M,,*47").fix);
        assert!(!parse_gga("$GPGGA,123519,4807.038,N,01131.000,E,1,eight,0.9,545.4,M,,M,,*47").fix);
        assert!(!parse_gga("$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,high,M,,M,,*47").fix);

        // Multi-byte characters must not panic the slicing
        assert!(!parse_gga("$GPGGA,123519,é807.038,N,01131.000,E,1,08,0.9,545.4,M,,M,,*47").fix);
    }

    #[test]
    fn test_prefixes() {
        assert!(is_gga("$GPGGA,1"));
        assert!(is_gga("$GNGGA,1"));
        assert!(!is_gga("$GPRMC,1"));
        assert!(!is_gga(""));
    }

    #[test]
    fn test_checksum() {
        // Reference sentence from the NMEA 0183 standard
        assert_eq!(
            nmea_checksum("GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,"),
            0x47
        );

        let sentence = format_sentence("GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,");
        assert!(sentence.ends_with("*47\r\n"));
        assert!(sentence.starts_with("$GPGGA"));
    }

    #[test]
    fn test_format_coordinate() {
        assert_eq!(format_coordinate(48.1173, 2, 'N', 'S'), (String::from("4807.0380"), 'N'));
        assert_eq!(format_coordinate(-151.21, 3, 'E', 'W'), (String::from("15112.6000"), 'W'));
    }
}
