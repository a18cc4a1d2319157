use std::fmt;

use serde::{Deserialize, Serialize};

pub mod geojson;

pub use geojson::{Feature, FeatureCollection, Geometry, Polygon};

/// Stable identifier of a sounding: its 0-based line position in the cm file
/// it was loaded from. Deleting rows never renumbers the survivors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(pub u32);

impl RowId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Column positions of the cm flat file.
pub mod columns {
    pub const ID: usize = 0;
    pub const LON: usize = 1;
    pub const LAT: usize = 2;
    pub const DEPTH: usize = 3;
    pub const SIG_H: usize = 4;
    pub const SIG_D: usize = 5;
    pub const SOURCE_ID: usize = 6;
    pub const PREDICTED_DEPTH: usize = 7;
    pub const ML_SCORE: usize = 8;
    /// Written on every save; absent from raw classifier output.
    pub const FLAG: usize = 9;

    /// Minimum number of columns a cm row must carry.
    pub const REQUIRED: usize = 9;
    /// Columns with a fixed meaning (required + flag). Anything past this is metadata.
    pub const DEFINED: usize = 10;
}

/// Flag value of a sounding that has not been touched by the operator.
pub const FLAG_UNSET: i64 = 0;
/// Flag value marking a sounding as excluded/bad.
pub const FLAG_EXCLUDED: i64 = -9999;

/// A geographic position in the internal (latitude, longitude) order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Quality class derived from the precomputed ML score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreClass {
    Bad,
    Uncertain,
    Good,
}

impl ScoreClass {
    /// Marker colour used by the 2D map for this class
    pub fn color_hex(&self) -> &'static str {
        match self {
            ScoreClass::Bad => "#d73027",
            ScoreClass::Uncertain => "#fdae61",
            ScoreClass::Good => "#4575b4",
        }
    }

    pub fn all() -> &'static [ScoreClass] {
        &[ScoreClass::Bad, ScoreClass::Uncertain, ScoreClass::Good]
    }
}

/// Two operator-chosen cut points partitioning ML scores.
///
/// `score <= bad` is bad, `bad < score <= uncertain` is uncertain, anything
/// above `uncertain` is good.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreThresholds {
    pub bad: f64,
    pub uncertain: f64,
}

impl Default for ScoreThresholds {
    fn default() -> Self {
        Self {
            bad: 0.3,
            uncertain: 0.6,
        }
    }
}

impl ScoreThresholds {
    pub fn new(bad: f64, uncertain: f64) -> Self {
        Self { bad, uncertain }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.bad.is_finite() || !self.uncertain.is_finite() {
            return Err("score thresholds must be finite".to_string());
        }
        if self.bad > self.uncertain {
            return Err(format!(
                "bad threshold {} is above uncertain threshold {}",
                self.bad, self.uncertain
            ));
        }
        Ok(())
    }

    /// `score <= bad` is bad, `score >= uncertain` is good, anything between
    /// is uncertain.
    pub fn classify(&self, score: f64) -> ScoreClass {
        if score <= self.bad {
            ScoreClass::Bad
        } else if score < self.uncertain {
            ScoreClass::Uncertain
        } else {
            ScoreClass::Good
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_boundaries() {
        let t = ScoreThresholds::new(0.3, 0.6);
        assert_eq!(t.classify(0.3), ScoreClass::Bad);
        assert_eq!(t.classify(0.30001), ScoreClass::Uncertain);
        assert_eq!(t.classify(0.59), ScoreClass::Uncertain);
        assert_eq!(t.classify(0.6), ScoreClass::Good);
        assert_eq!(t.classify(-1.0), ScoreClass::Bad);
    }

    #[test]
    fn test_thresholds_validate() {
        assert!(ScoreThresholds::default().validate().is_ok());
        assert!(ScoreThresholds::new(0.7, 0.2).validate().is_err());
        assert!(ScoreThresholds::new(f64::NAN, 0.2).validate().is_err());
    }

    #[test]
    fn test_row_id_serde_transparent() {
        let json = serde_json::to_string(&RowId(42)).unwrap();
        assert_eq!(json, "42");
        let back: RowId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, RowId(42));
    }
}
