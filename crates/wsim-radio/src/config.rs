//! Radio parameters.

use crate::RadioConfigError;
use serde::{Deserialize, Serialize};
use wsim_common::{RandomSource, SimTime};

/// PHY constants and loss model parameters shared by every node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioConfig {
    /// On-air length of every packet in bits.
    pub packet_bits: u32,
    /// Nominal bit rate in bits per second.
    pub bit_rate_bps: f64,
    /// Propagation speed in distance units per second.
    pub speed_of_light: f64,
    /// Probability that any single delivery is lost to random noise.
    pub noise_drop_probability: f64,
    /// Loss probability at the edge of the range; scales linearly with distance.
    pub distance_drop_factor: f64,
    /// Signal level at zero distance.
    pub max_signal_dbm: f64,
    /// Signal level at the edge of the range.
    pub min_signal_dbm: f64,
    /// Crystal tolerance; each node's clock skew is drawn within +/- this.
    pub clock_tolerance_ppm: f64,
}

impl Default for RadioConfig {
    fn default() -> Self {
        RadioConfig {
            packet_bits: 256,
            bit_rate_bps: 250_000.0,
            speed_of_light: 299_792_458.0,
            noise_drop_probability: 0.01,
            distance_drop_factor: 0.7,
            max_signal_dbm: 0.0,
            min_signal_dbm: -80.0,
            clock_tolerance_ppm: 50.0,
        }
    }
}

impl RadioConfig {
    /// A lossless configuration: no noise, no fading, perfect clocks.
    pub fn lossless() -> Self {
        RadioConfig {
            noise_drop_probability: 0.0,
            distance_drop_factor: 0.0,
            clock_tolerance_ppm: 0.0,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), RadioConfigError> {
        positive("packet_bits", self.packet_bits as f64)?;
        positive("bit_rate_bps", self.bit_rate_bps)?;
        positive("speed_of_light", self.speed_of_light)?;
        probability("noise_drop_probability", self.noise_drop_probability)?;
        probability("distance_drop_factor", self.distance_drop_factor)?;
        if !(self.clock_tolerance_ppm >= 0.0 && self.clock_tolerance_ppm < 1_000_000.0) {
            return Err(RadioConfigError::NotPositive {
                field: "clock_tolerance_ppm",
                value: self.clock_tolerance_ppm,
            });
        }
        Ok(())
    }

    /// Airtime of one packet from a node with the given clock skew.
    pub fn packet_duration(&self, clock_skew: f64) -> SimTime {
        SimTime::from_secs(self.packet_bits as f64 / self.bit_rate_bps * clock_skew)
    }

    /// Propagation delay over `distance`.
    pub fn propagation_delay(&self, distance: f64) -> SimTime {
        SimTime::from_secs(distance / self.speed_of_light)
    }

    /// Signal level, linear from `max_signal_dbm` at 0 to `min_signal_dbm` at `range`.
    pub fn signal_level(&self, distance: f64, range: f64) -> f64 {
        self.max_signal_dbm + (self.min_signal_dbm - self.max_signal_dbm) * (distance / range)
    }

    /// Draw a per-node clock skew factor around 1.0.
    pub fn draw_clock_skew(&self, rng: &mut RandomSource) -> f64 {
        let tolerance = self.clock_tolerance_ppm * 1e-6;
        1.0 + rng.gen_range_f64(-tolerance..tolerance)
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), RadioConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(RadioConfigError::NotPositive { field, value })
    }
}

fn probability(field: &'static str, value: f64) -> Result<(), RadioConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(RadioConfigError::InvalidProbability { field, value })
    }
}
