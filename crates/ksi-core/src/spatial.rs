//! Spatial sampling: polyline decoding and geohash cells.
//!
//! A route geometry arrives as a Google-encoded polyline with hundreds of
//! points. We reduce it to a bounded set of fixed-precision geohash cells:
//! take every k-th point, encode, deduplicate, sort. The sorted-set form makes
//! the sample deterministic for a given geometry.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::DecodeError;

/// Default geohash precision. Five characters ≈ a 4.9 x 4.9 km cell, which
/// bounds frame cardinality even for cross-city routes.
pub const DEFAULT_PRECISION: usize = 5;

/// Default sampling stride over polyline points.
pub const DEFAULT_STRIDE: usize = 5;

const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// Fixed-precision geohash cell identifier.
///
/// Ordering is plain lexicographic string order, which is what keeps a
/// route's sample set deterministic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpatialKey(String);

impl SpatialKey {
    /// Encode a position into a geohash cell of the given precision.
    pub fn encode(lat: f64, lon: f64, precision: usize) -> Self {
        let mut lat_range = (-90.0_f64, 90.0_f64);
        let mut lon_range = (-180.0_f64, 180.0_f64);
        let mut key = String::with_capacity(precision);
        let mut even_bit = true; // longitude first
        let mut bits = 0u8;
        let mut bit_count = 0u8;

        while key.len() < precision {
            let (value, range) = if even_bit {
                (lon, &mut lon_range)
            } else {
                (lat, &mut lat_range)
            };
            let mid = (range.0 + range.1) / 2.0;
            bits <<= 1;
            if value >= mid {
                bits |= 1;
                range.0 = mid;
            } else {
                range.1 = mid;
            }
            even_bit = !even_bit;
            bit_count += 1;
            if bit_count == 5 {
                key.push(BASE32[bits as usize] as char);
                bits = 0;
                bit_count = 0;
            }
        }

        Self(key)
    }

    /// Decode back to the center of the cell.
    pub fn decode(&self) -> (f64, f64) {
        let mut lat_range = (-90.0_f64, 90.0_f64);
        let mut lon_range = (-180.0_f64, 180.0_f64);
        let mut even_bit = true;

        for c in self.0.bytes() {
            let value = BASE32.iter().position(|&b| b == c).unwrap_or(0) as u8;
            for shift in (0..5).rev() {
                let bit = (value >> shift) & 1;
                let range = if even_bit {
                    &mut lon_range
                } else {
                    &mut lat_range
                };
                let mid = (range.0 + range.1) / 2.0;
                if bit == 1 {
                    range.0 = mid;
                } else {
                    range.1 = mid;
                }
                even_bit = !even_bit;
            }
        }

        (
            (lat_range.0 + lat_range.1) / 2.0,
            (lon_range.0 + lon_range.1) / 2.0,
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SpatialKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decode a Google encoded polyline into (lat, lon) pairs.
///
/// Coordinates are delta-encoded at 1e-5 precision. Any byte outside the
/// printable encoding range, a value that ends mid-chunk or never
/// terminates, or a coordinate outside WGS84 bounds fails the whole
/// geometry.
pub fn decode_polyline(encoded: &str) -> Result<Vec<(f64, f64)>, DecodeError> {
    let bytes = encoded.as_bytes();
    let mut points = Vec::new();
    let mut index = 0usize;
    let mut lat = 0i64;
    let mut lon = 0i64;

    while index < bytes.len() {
        lat += decode_value(bytes, &mut index)?;
        lon += decode_value(bytes, &mut index)?;

        let lat_deg = lat as f64 * 1e-5;
        let lon_deg = lon as f64 * 1e-5;
        if !(-90.0..=90.0).contains(&lat_deg) || !(-180.0..=180.0).contains(&lon_deg) {
            return Err(DecodeError::OutOfRange {
                lat: lat_deg,
                lon: lon_deg,
            });
        }
        points.push((lat_deg, lon_deg));
    }

    Ok(points)
}

fn decode_value(bytes: &[u8], index: &mut usize) -> Result<i64, DecodeError> {
    let mut result = 0i64;
    let mut shift = 0u32;

    loop {
        let Some(&byte) = bytes.get(*index) else {
            return Err(DecodeError::Truncated(*index));
        };
        if !(63..=126).contains(&byte) {
            return Err(DecodeError::InvalidByte {
                byte,
                index: *index,
            });
        }
        // Seven chunks already exceed any 1e-5 coordinate delta; a longer
        // run of continuation bytes is garbage, not a bigger number.
        if shift > 30 {
            return Err(DecodeError::Overflow(*index));
        }
        *index += 1;

        let chunk = (byte - 63) as i64;
        result |= (chunk & 0x1f) << shift;
        shift += 5;

        if chunk & 0x20 == 0 {
            break;
        }
    }

    Ok(if result & 1 != 0 {
        !(result >> 1)
    } else {
        result >> 1
    })
}

/// Reduce a decoded geometry to its sample cells: every `stride`-th point,
/// geohash-encoded, deduplicated, sorted. The first point is always taken,
/// so a non-empty geometry never yields an empty set.
pub fn sample_keys(
    points: &[(f64, f64)],
    stride: usize,
    precision: usize,
) -> BTreeSet<SpatialKey> {
    points
        .iter()
        .step_by(stride.max(1))
        .map(|&(lat, lon)| SpatialKey::encode(lat, lon, precision))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Reference example from the Google polyline encoding docs.
    const GOOGLE_EXAMPLE: &str = "_p~iF~ps|U_ulLnnqC_mqNvxq`@";

    #[test]
    fn decode_polyline_matches_reference() {
        let points = decode_polyline(GOOGLE_EXAMPLE).unwrap();
        assert_eq!(points.len(), 3);
        assert!((points[0].0 - 38.5).abs() < 1e-9);
        assert!((points[0].1 - -120.2).abs() < 1e-9);
        assert!((points[2].0 - 43.252).abs() < 1e-9);
        assert!((points[2].1 - -126.453).abs() < 1e-9);
    }

    #[test]
    fn decode_polyline_rejects_truncated_input() {
        // Drop the final byte so the last value ends mid-chunk.
        let truncated = &GOOGLE_EXAMPLE[..GOOGLE_EXAMPLE.len() - 1];
        assert!(matches!(
            decode_polyline(truncated),
            Err(DecodeError::Truncated(_))
        ));
    }

    #[test]
    fn decode_polyline_rejects_runaway_continuation() {
        // Every byte keeps the continuation bit set, so the value never
        // terminates and its shift would run off the end of an i64.
        let runaway = "~".repeat(14);
        assert!(matches!(
            decode_polyline(&runaway),
            Err(DecodeError::Overflow(_))
        ));
    }

    #[test]
    fn decode_polyline_rejects_bad_byte() {
        assert!(matches!(
            decode_polyline("_p~iF\t"),
            Err(DecodeError::InvalidByte { .. })
        ));
    }

    #[test]
    fn geohash_known_cell() {
        // Toronto downtown falls in dpz8 at precision 5.
        let key = SpatialKey::encode(43.6532, -79.3832, 5);
        assert_eq!(key.as_str(), "dpz83");
    }

    #[test]
    fn geohash_round_trip_within_cell() {
        // Precision-5 cells are at most ~0.044° tall and ~0.044° wide.
        for &(lat, lon) in &[(43.6532, -79.3832), (0.0, 0.0), (-33.86, 151.21)] {
            let key = SpatialKey::encode(lat, lon, 5);
            let (dec_lat, dec_lon) = key.decode();
            assert!((dec_lat - lat).abs() < 0.045, "lat drift for {key}");
            assert!((dec_lon - lon).abs() < 0.045, "lon drift for {key}");
        }
    }

    #[test]
    fn sample_keys_bounded_sorted_dedup() {
        let points: Vec<(f64, f64)> = (0..100)
            .map(|i| (43.6 + i as f64 * 0.001, -79.4 + i as f64 * 0.001))
            .collect();
        let keys = sample_keys(&points, 5, 5);

        assert!(!keys.is_empty());
        assert!(keys.len() <= points.len().div_ceil(5));
        let as_vec: Vec<&SpatialKey> = keys.iter().collect();
        assert!(as_vec.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn sample_keys_short_geometry_still_sampled() {
        let keys = sample_keys(&[(43.6532, -79.3832)], 5, 5);
        assert_eq!(keys.len(), 1);
    }
}
