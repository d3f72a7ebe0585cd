//! Ordnance Survey grid references to WGS84 latitude/longitude.
//!
//! A reference such as `SU 12345 67890` names a 100 km square by two letters and
//! then the easting/northing offsets within it. The OSGB36 easting/northing is
//! converted to WGS84 with `lonlat_bng` (OSTN15 transformation). Nothing here
//! fails: anything that cannot be converted is `None`.

use lonlat_bng::convert_osgb36_to_ll;

const MIN_REFERENCE_LEN: usize = 4;
const MAX_DIGITS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPosition {
    pub easting: f64,
    pub northing: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLong {
    pub latitude: f64,
    pub longitude: f64,
}

/// Strips spaces and punctuation, e.g. `"SU 123 456"` -> `"SU123456"`.
pub fn clean_grid_reference(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

fn letter_index(letter: char) -> Option<i32> {
    let upper = letter.to_ascii_uppercase();
    if !upper.is_ascii_uppercase() || upper == 'I' {
        return None;
    }
    let idx = upper as i32 - 'A' as i32;
    Some(if idx > 7 { idx - 1 } else { idx })
}

/// Parses a cleaned reference into easting/northing metres of the square's south-west corner.
pub fn parse_grid_reference(cleaned: &str) -> Option<GridPosition> {
    if cleaned.len() < MIN_REFERENCE_LEN || !cleaned.is_ascii() {
        return None;
    }

    let mut chars = cleaned.chars();
    let l1 = letter_index(chars.next()?)?;
    let l2 = letter_index(chars.next()?)?;
    let digits = &cleaned[2..];
    if digits.len() > MAX_DIGITS
        || digits.len() % 2 != 0
        || !digits.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }

    let e100km = ((l1 - 2) % 5) * 5 + (l2 % 5);
    let n100km = (19 - (l1 / 5) * 5) - (l2 / 5);
    if !(0..=6).contains(&e100km) || !(0..=12).contains(&n100km) {
        return None;
    }

    let half = digits.len() / 2;
    let offset = |part: &str| -> Option<f64> {
        let padded = format!("{part:0<5}");
        padded.parse::<u32>().ok().map(f64::from)
    };
    let easting = f64::from(e100km) * 100_000.0 + offset(&digits[..half])?;
    let northing = f64::from(n100km) * 100_000.0 + offset(&digits[half..])?;

    Some(GridPosition { easting, northing })
}

/// Converts a raw grid reference straight to WGS84; `None` for blank, short, or malformed
/// input and for positions outside the OSTN15 coverage.
pub fn grid_to_latlong(raw: &str) -> Option<LatLong> {
    let cleaned = clean_grid_reference(raw);
    let position = parse_grid_reference(&cleaned)?;
    let (longitude, latitude) = convert_osgb36_to_ll(position.easting, position.northing).ok()?;
    (latitude.is_finite() && longitude.is_finite()).then_some(LatLong {
        latitude,
        longitude,
    })
}
