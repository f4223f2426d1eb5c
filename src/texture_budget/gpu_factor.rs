//! GPU memory factor presets
//!
//! The user picks how much GPU memory the renderer may claim. The factor
//! scales the bucket lookup buffer and the address space it can describe.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum GpuFactor {
    Low = 1,
    Medium = 3,
    High = 6,
    VeryHigh = 12,
}

impl GpuFactor {
    pub fn multiplier(self) -> u32 {
        self as u32
    }

    pub fn label(self) -> &'static str {
        match self {
            GpuFactor::Low => "Low",
            GpuFactor::Medium => "Medium",
            GpuFactor::High => "High",
            GpuFactor::VeryHigh => "Very High",
        }
    }

    /// All presets, largest first
    pub fn all() -> [GpuFactor; 4] {
        [GpuFactor::VeryHigh, GpuFactor::High, GpuFactor::Medium, GpuFactor::Low]
    }

    pub fn lookup_buffer_size(self) -> u32 {
        lookup_buffer_size(self.multiplier())
    }

    pub fn address_space_dimensions(self) -> [u32; 3] {
        address_space_dimensions(self.multiplier())
    }
}

impl Default for GpuFactor {
    fn default() -> Self {
        GpuFactor::High
    }
}

/// Unknown multipliers fall back to `High`, matching the 512 lookup size
/// `lookup_buffer_size` picks for them
impl From<u32> for GpuFactor {
    fn from(value: u32) -> Self {
        match value {
            1 => GpuFactor::Low,
            3 => GpuFactor::Medium,
            6 => GpuFactor::High,
            12 => GpuFactor::VeryHigh,
            other => {
                log::warn!("[TextureBudget] Unknown GPU factor {}, using High", other);
                GpuFactor::High
            }
        }
    }
}

impl From<GpuFactor> for u32 {
    fn from(factor: GpuFactor) -> Self {
        factor.multiplier()
    }
}

/// `(multiplier, label)` pairs, largest first
pub fn gpu_factors_with_labels() -> Vec<(u32, &'static str)> {
    GpuFactor::all()
        .iter()
        .map(|factor| (factor.multiplier(), factor.label()))
        .collect()
}

/// Edge length of the square lookup buffer for a multiplier.
/// Unknown multipliers fall back to 512.
pub fn lookup_buffer_size(gpu_multiplier: u32) -> u32 {
    match gpu_multiplier {
        1 | 3 => 256,
        6 => 512,
        12 => 1024,
        _ => 512,
    }
}

/// A lookup buffer of `size²` entries can address a bucket volume of these
/// dimensions. The volumes were chosen so that their product divided by
/// `size²` is close to one.
pub fn address_space_dimensions(gpu_multiplier: u32) -> [u32; 3] {
    match lookup_buffer_size(gpu_multiplier) {
        512 => [61, 61, 70],
        1024 => [96, 96, 112],
        _ => [36, 36, 50],
    }
}
