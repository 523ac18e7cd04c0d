//! Trailing stop tuning parameters.
//!
//! `TrailingStopParams` is the plain serde form read from TOML.
//! `TrailingStopConfig` is the validated form the stop engine consumes; it can
//! only be obtained through validation, so an engine never sees `floor >= ceiling`
//! or a negative percentage.

use crate::error::{CoreError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Raw trailing stop parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailingStopParams {
    /// Noise-coverage multiplier applied to ATR%.
    #[serde(default = "default_z")]
    pub z: Decimal,

    /// Scales the market-impact term (trade size / pool liquidity).
    #[serde(default = "default_alpha")]
    pub alpha: Decimal,

    /// Scales the spread buffer. Keep at 1.0 and set the spread directly.
    #[serde(default = "default_beta")]
    pub beta: Decimal,

    /// Hard minimum stop distance.
    #[serde(default = "default_floor_pct")]
    pub floor_pct: Decimal,

    /// Hard maximum stop distance.
    #[serde(default = "default_ceiling_pct")]
    pub ceiling_pct: Decimal,

    /// Fraction of the entry stop distance that must be gained before the
    /// stop starts trailing.
    #[serde(default = "default_arm_factor")]
    pub arm_factor: Decimal,

    /// Recompute the stop distance when volatility spikes above the entry level.
    #[serde(default = "default_tighten_on_vol_spike")]
    pub tighten_on_vol_spike: bool,

    /// Volatility multiple over the entry ATR% that counts as a spike.
    #[serde(default = "default_vol_spike_mult")]
    pub vol_spike_mult: Decimal,
}

fn default_z() -> Decimal {
    Decimal::new(165, 2) // 1.65
}

fn default_alpha() -> Decimal {
    Decimal::new(18, 1) // 1.8
}

fn default_beta() -> Decimal {
    Decimal::ONE
}

fn default_floor_pct() -> Decimal {
    Decimal::new(6, 2) // 6%
}

fn default_ceiling_pct() -> Decimal {
    Decimal::new(40, 2) // 40%
}

fn default_arm_factor() -> Decimal {
    Decimal::new(7, 1) // 0.7
}

fn default_tighten_on_vol_spike() -> bool {
    true
}

fn default_vol_spike_mult() -> Decimal {
    Decimal::new(15, 1) // 1.5
}

impl Default for TrailingStopParams {
    fn default() -> Self {
        Self {
            z: default_z(),
            alpha: default_alpha(),
            beta: default_beta(),
            floor_pct: default_floor_pct(),
            ceiling_pct: default_ceiling_pct(),
            arm_factor: default_arm_factor(),
            tighten_on_vol_spike: default_tighten_on_vol_spike(),
            vol_spike_mult: default_vol_spike_mult(),
        }
    }
}

impl TrailingStopParams {
    /// Validate parameter ranges.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(CoreError::InvalidConfig(msg));

        if self.z <= Decimal::ZERO {
            return invalid(format!("z must be > 0, got {}", self.z));
        }
        if self.alpha <= Decimal::ZERO {
            return invalid(format!("alpha must be > 0, got {}", self.alpha));
        }
        if self.beta < Decimal::ZERO {
            return invalid(format!("beta must be >= 0, got {}", self.beta));
        }
        if self.floor_pct <= Decimal::ZERO {
            return invalid(format!("floor_pct must be > 0, got {}", self.floor_pct));
        }
        if self.floor_pct >= self.ceiling_pct {
            return invalid(format!(
                "floor_pct ({}) must be below ceiling_pct ({})",
                self.floor_pct, self.ceiling_pct
            ));
        }
        if self.ceiling_pct > Decimal::ONE {
            return invalid(format!(
                "ceiling_pct must be <= 1, got {}",
                self.ceiling_pct
            ));
        }
        if self.arm_factor <= Decimal::ZERO || self.arm_factor > Decimal::ONE {
            return invalid(format!(
                "arm_factor must be in (0, 1], got {}",
                self.arm_factor
            ));
        }
        if self.vol_spike_mult <= Decimal::ONE {
            return invalid(format!(
                "vol_spike_mult must be > 1, got {}",
                self.vol_spike_mult
            ));
        }
        Ok(())
    }
}

/// Validated trailing stop configuration.
///
/// Immutable once built. Process-wide defaults come from `Default`; a position
/// may carry its own instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TrailingStopParams", into = "TrailingStopParams")]
pub struct TrailingStopConfig {
    params: TrailingStopParams,
}

impl TrailingStopConfig {
    /// Build a configuration, rejecting invalid ranges.
    pub fn new(params: TrailingStopParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &TrailingStopParams {
        &self.params
    }

    pub fn z(&self) -> Decimal {
        self.params.z
    }

    pub fn alpha(&self) -> Decimal {
        self.params.alpha
    }

    pub fn beta(&self) -> Decimal {
        self.params.beta
    }

    pub fn floor_pct(&self) -> Decimal {
        self.params.floor_pct
    }

    pub fn ceiling_pct(&self) -> Decimal {
        self.params.ceiling_pct
    }

    pub fn arm_factor(&self) -> Decimal {
        self.params.arm_factor
    }

    pub fn tighten_on_vol_spike(&self) -> bool {
        self.params.tighten_on_vol_spike
    }

    pub fn vol_spike_mult(&self) -> Decimal {
        self.params.vol_spike_mult
    }

    /// Clamp a raw stop distance into `[floor_pct, ceiling_pct]`.
    #[inline]
    pub fn clamp_pct(&self, raw: Decimal) -> Decimal {
        raw.max(self.params.floor_pct).min(self.params.ceiling_pct)
    }
}

impl Default for TrailingStopConfig {
    fn default() -> Self {
        Self {
            params: TrailingStopParams::default(),
        }
    }
}

impl TryFrom<TrailingStopParams> for TrailingStopConfig {
    type Error = CoreError;

    fn try_from(params: TrailingStopParams) -> Result<Self> {
        Self::new(params)
    }
}

impl From<TrailingStopConfig> for TrailingStopParams {
    fn from(config: TrailingStopConfig) -> Self {
        config.params
    }
}
