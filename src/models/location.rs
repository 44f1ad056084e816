use serde::{Deserialize, Serialize};

/// Decimal places kept when composing a key. Four places is roughly 11 m at
/// the equator, well below the resolution of any geocoding hit.
const KEY_DECIMALS: usize = 4;

/// Canonical identity for a coordinate pair. Cache entries, favorites and
/// in-memory weather maps all join on this key.
///
/// Coordinates are normalized to a fixed precision before the key text is
/// built, so `1.0` and `1.00000001` produce the same key regardless of how
/// the floats were formatted upstream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocationKey(String);

impl LocationKey {
    /// Derive the key for a coordinate pair. Pure and deterministic.
    pub fn derive(latitude: f64, longitude: f64) -> Self {
        Self(format!(
            "{}_{}",
            normalize_coordinate(latitude),
            normalize_coordinate(longitude)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for LocationKey {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for LocationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn normalize_coordinate(value: f64) -> String {
    let scale = 10f64.powi(KEY_DECIMALS as i32);
    let rounded = (value * scale).round() / scale;
    // -0.00001 rounds to -0.0, which formats with its sign; collapse it
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{rounded:.p$}", p = KEY_DECIMALS)
}
