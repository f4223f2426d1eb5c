use wgpu::{Adapter, Instance, Limits};

use crate::constants::hardware::{
    HEADLESS_BOUND_TEXTURES, HEADLESS_TEXTURE_DIMENSION, MIN_BOUND_TEXTURES, MIN_TEXTURE_DIMENSION,
};
use crate::error::{PlannerError, PlannerResult, ProbeError};

/// Host graphics limits relevant to texture budgeting.
///
/// Probed once per session and treated as an immutable snapshot afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CapabilityLimits {
    /// Largest edge length of a single 2D texture
    pub max_texture_dimension: u32,
    /// How many textures a shader stage may sample at once
    pub max_bound_textures: u32,
}

impl CapabilityLimits {
    pub fn new(max_texture_dimension: u32, max_bound_textures: u32) -> Self {
        Self {
            max_texture_dimension,
            max_bound_textures,
        }
    }

    pub fn from_wgpu_limits(limits: &Limits) -> Self {
        Self {
            max_texture_dimension: limits.max_texture_dimension_2d,
            max_bound_textures: limits.max_sampled_textures_per_shader_stage,
        }
    }

    /// Limits assumed when no graphics context can be created at all
    pub fn headless() -> Self {
        Self {
            max_texture_dimension: HEADLESS_TEXTURE_DIMENSION,
            max_bound_textures: HEADLESS_BOUND_TEXTURES,
        }
    }

    pub fn meets_minimum(&self) -> bool {
        self.max_texture_dimension >= MIN_TEXTURE_DIMENSION
            && self.max_bound_textures >= MIN_BOUND_TEXTURES
    }
}

/// Hard minimum-hardware gate. There is no degraded mode below it.
pub fn validate_minimum_requirements(limits: &CapabilityLimits) -> PlannerResult<()> {
    if limits.meets_minimum() {
        return Ok(());
    }

    Err(PlannerError::UnsupportedHardware {
        max_texture_dimension: limits.max_texture_dimension,
        max_bound_textures: limits.max_bound_textures,
        min_dimension: MIN_TEXTURE_DIMENSION,
        min_textures: MIN_BOUND_TEXTURES,
    })
}

/// Read the limits of an already acquired adapter
pub fn probe_adapter(adapter: &Adapter) -> CapabilityLimits {
    let info = adapter.get_info();
    let limits = CapabilityLimits::from_wgpu_limits(&adapter.limits());

    log::info!(
        "[GPU Probe] {} ({:?}): max texture {} / {} bound textures",
        info.name,
        info.backend,
        limits.max_texture_dimension,
        limits.max_bound_textures
    );

    if limits.max_texture_dimension < MIN_TEXTURE_DIMENSION {
        log::warn!(
            "[GPU Probe] Low max texture dimension: {} (required: {}+)",
            limits.max_texture_dimension,
            MIN_TEXTURE_DIMENSION
        );
    }

    limits
}

/// Request the default adapter and read its limits
pub async fn probe_default_adapter() -> Result<CapabilityLimits, ProbeError> {
    let instance = Instance::new(wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .ok_or(ProbeError::NoAdapter)?;

    Ok(probe_adapter(&adapter))
}
