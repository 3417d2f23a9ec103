//! Tunables for network construction and output assembly.
//!
//! All options carry defaults so a config file only needs to name what it
//! changes (`#[serde(default)]`).

use crate::network_error::NetworkError;

/// Soft caps on adjacency list lengths. `None` means unbounded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ConnectionLimits {
    pub upstream: Option<usize>,
    pub downstream: Option<usize>,
}

/// Fixed widths of the per-element lists in the channel element output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OutputLimits {
    pub max_vertices: usize,
    pub max_channel_neighbors: usize,
    pub max_mesh_neighbors: usize,
}

impl Default for OutputLimits {
    fn default() -> Self {
        Self {
            max_vertices: 32,
            max_channel_neighbors: 16,
            max_mesh_neighbors: 32,
        }
    }
}

/// Power-law bankfull geometry, `value = coefficient * area_km2 ^ exponent`.
///
/// Defaults are the conterminous-US regional curve of Bieger et al. (2015).
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct HydraulicGeometry {
    pub width_coefficient: f64,
    pub width_exponent: f64,
    pub depth_coefficient: f64,
    pub depth_exponent: f64,
}

impl Default for HydraulicGeometry {
    fn default() -> Self {
        Self {
            width_coefficient: 2.70,
            width_exponent: 0.352,
            depth_coefficient: 0.30,
            depth_exponent: 0.213,
        }
    }
}

impl HydraulicGeometry {
    /// `(top width, bankfull depth)` in meters for a contributing area in m².
    pub fn bankfull(&self, area_m2: f64) -> (f64, f64) {
        let km2 = (area_m2 / 1.0e6).max(0.0);
        (
            self.width_coefficient * km2.powf(self.width_exponent),
            self.depth_coefficient * km2.powf(self.depth_exponent),
        )
    }
}

/// Construction options.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Target channel element length in meters, indexed by stream order
    /// (entry 0 is order 1). Orders past the end use the last entry.
    pub target_element_lengths: Vec<f64>,
    /// A stream shorter than this fraction of its target element length is
    /// merged into its upstream neighbors.
    pub short_link_ratio: f64,
    /// Half-width applied when a mesh edge projects to a single location.
    /// Heuristic kept for compatibility; it has no geometric derivation.
    pub coincident_nudge: f64,
    pub connection_limits: ConnectionLimits,
    pub output_limits: OutputLimits,
    pub hydraulic_geometry: HydraulicGeometry,
    /// Bankfull depth given to waterbody and ice-mass elements.
    pub waterbody_bankfull_depth: f64,
    /// Check invariants between phases even in release builds.
    pub check_invariants: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            target_element_lengths: vec![250.0, 500.0, 750.0, 1000.0, 1500.0, 2000.0],
            short_link_ratio: 0.5,
            coincident_nudge: 1.0,
            connection_limits: ConnectionLimits::default(),
            output_limits: OutputLimits::default(),
            hydraulic_geometry: HydraulicGeometry::default(),
            waterbody_bankfull_depth: 5.0,
            check_invariants: false,
        }
    }
}

impl NetworkConfig {
    /// Target element length for `stream_order`. Orders below 1 use order 1,
    /// orders past the table use its last entry.
    ///
    /// # Errors
    /// `InvalidConfig` if `target_element_lengths` is empty.
    pub fn target_element_length(&self, stream_order: u32) -> Result<f64, NetworkError> {
        let idx = stream_order.max(1) as usize - 1;
        self.target_element_lengths
            .get(idx)
            .or_else(|| self.target_element_lengths.last())
            .copied()
            .ok_or_else(|| NetworkError::InvalidConfig("target_element_lengths is empty".into()))
    }

    /// Length below which a stream of this order counts as short.
    pub fn short_link_threshold(&self, stream_order: u32) -> Result<f64, NetworkError> {
        Ok(self.short_link_ratio * self.target_element_length(stream_order)?)
    }

    /// Reject values the algorithms cannot work with.
    pub fn validate(&self) -> Result<(), NetworkError> {
        if self.target_element_lengths.is_empty() {
            return Err(NetworkError::InvalidConfig(
                "target_element_lengths is empty".into(),
            ));
        }
        if let Some(bad) = self
            .target_element_lengths
            .iter()
            .find(|l| !(l.is_finite() && **l > 0.0))
        {
            return Err(NetworkError::InvalidConfig(format!(
                "target element length {bad} must be positive"
            )));
        }
        if !(self.short_link_ratio.is_finite() && self.short_link_ratio >= 0.0) {
            return Err(NetworkError::InvalidConfig(format!(
                "short_link_ratio {} must be non-negative",
                self.short_link_ratio
            )));
        }
        if !(self.coincident_nudge.is_finite() && self.coincident_nudge > 0.0) {
            return Err(NetworkError::InvalidConfig(format!(
                "coincident_nudge {} must be positive",
                self.coincident_nudge
            )));
        }
        let limits = self.output_limits;
        if limits.max_vertices < 2 {
            return Err(NetworkError::InvalidConfig(
                "max_vertices must be at least 2".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_lengths_clamp_to_table() {
        let cfg = NetworkConfig::default();
        assert_eq!(cfg.target_element_length(0).unwrap(), 250.0);
        assert_eq!(cfg.target_element_length(1).unwrap(), 250.0);
        assert_eq!(cfg.target_element_length(3).unwrap(), 750.0);
        assert_eq!(cfg.target_element_length(40).unwrap(), 2000.0);
        assert_eq!(cfg.short_link_threshold(2).unwrap(), 250.0);
    }

    #[test]
    fn empty_target_table_is_an_error() {
        let cfg = NetworkConfig {
            target_element_lengths: vec![],
            ..Default::default()
        };
        assert!(matches!(
            cfg.target_element_length(1),
            Err(NetworkError::InvalidConfig(_))
        ));
        assert!(cfg.short_link_threshold(1).is_err());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let cfg: NetworkConfig =
            serde_json::from_str(r#"{ "short_link_ratio": 0.25, "connection_limits": { "upstream": 4 } }"#)
                .unwrap();
        assert_eq!(cfg.short_link_ratio, 0.25);
        assert_eq!(cfg.connection_limits.upstream, Some(4));
        assert_eq!(cfg.connection_limits.downstream, None);
        assert_eq!(cfg.coincident_nudge, 1.0);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let cfg = NetworkConfig {
            target_element_lengths: vec![],
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(NetworkError::InvalidConfig(_))));
        let cfg = NetworkConfig {
            coincident_nudge: 0.0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn bankfull_grows_with_area() {
        let hg = HydraulicGeometry::default();
        let (w1, d1) = hg.bankfull(1.0e6);
        assert!((w1 - 2.70).abs() < 1e-12);
        assert!((d1 - 0.30).abs() < 1e-12);
        let (w2, d2) = hg.bankfull(100.0e6);
        assert!(w2 > w1 && d2 > d1);
    }
}
