//! Texture budget planning
//!
//! Decides how each layer's buckets are packed into GPU textures given the
//! hardware limits. Everything here is pure arithmetic on the inputs; the
//! same limits and layers always produce the same setup.

use std::collections::BTreeMap;

use crate::constants::hardware::{LOOKUP_TEXTURES_PER_LAYER, MAPPING_TEXTURE_COUNT};
use crate::constants::BUCKET_SIZE;
use crate::error::PlannerResult;
use crate::gpu::{validate_minimum_requirements, CapabilityLimits};
use crate::layer::{ElementClass, LayerDescriptor, LayerId};

/// How one layer is laid out in textures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PackingPlan {
    pub texture_dimension: u32,
    pub texture_count: u32,
    /// Logical voxels stored per texel
    pub packing_degree: u32,
}

impl PackingPlan {
    pub fn bucket_capacity(&self) -> u64 {
        bucket_capacity(self.texture_count, self.texture_dimension, self.packing_degree)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeatureSupport {
    pub basic_rendering_supported: bool,
    pub id_mapping_supported: bool,
}

/// Complete packing decision for a capability/layer-set pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureSetup {
    pub per_layer: BTreeMap<LayerId, PackingPlan>,
    pub features: FeatureSupport,
    /// Buckets every layer can hold at once; the shallowest layer wins
    pub shared_bucket_capacity: u64,
}

impl TextureSetup {
    pub fn plan_for(&self, layer: &LayerId) -> Option<&PackingPlan> {
        self.per_layer.get(layer)
    }

    /// Texture slots needed for basic rendering of all layers
    pub fn required_texture_slots(&self) -> u64 {
        required_texture_slots(&self.per_layer)
    }
}

/// Sub-32-bit voxels share a texel across the RGBA channels. Float
/// textures hold one float per channel.
pub fn packing_degree(byte_count: u32, element_class: ElementClass) -> u32 {
    if byte_count == 1 || element_class.is_float() {
        4
    } else if byte_count == 2 {
        2
    } else {
        1
    }
}

pub fn channel_count(byte_count: u32, packing_degree: u32, element_class: ElementClass) -> u32 {
    if element_class.is_float() {
        (byte_count / 4) * packing_degree
    } else {
        byte_count * packing_degree
    }
}

// Voxel counts are u128: a 2^31 texture with packing 4 already holds 2^64
// voxels.

pub fn bucket_capacity(texture_count: u32, texture_dimension: u32, packing_degree: u32) -> u64 {
    let voxels = texture_count as u128 * available_voxel_count(texture_dimension, packing_degree);
    saturate(voxels / BUCKET_SIZE as u128)
}

fn necessary_voxel_count(required_bucket_capacity: u32) -> u128 {
    required_bucket_capacity as u128 * BUCKET_SIZE as u128
}

fn available_voxel_count(texture_dimension: u32, packing_degree: u32) -> u128 {
    let dimension = texture_dimension as u128;
    packing_degree as u128 * dimension * dimension
}

fn texture_count(texture_dimension: u32, packing_degree: u32, required_bucket_capacity: u32) -> u64 {
    let available = available_voxel_count(texture_dimension, packing_degree);
    if available == 0 {
        return u64::MAX;
    }
    saturate(necessary_voxel_count(required_bucket_capacity).div_ceil(available))
}

fn saturate(value: u128) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

/// Size and count the data textures of a single layer.
///
/// Starts at the largest supported dimension and keeps halving as long as
/// the smaller textures do not need more slots.
pub fn plan_layer(
    limits: &CapabilityLimits,
    byte_count: u32,
    element_class: ElementClass,
    required_bucket_capacity: u32,
) -> PackingPlan {
    let packing_degree = packing_degree(byte_count, element_class);
    let mut texture_dimension = limits.max_texture_dimension;

    // Only even dimensions are halved so the result stays a power-of-two
    // factor of the hardware maximum.
    while texture_dimension > 1
        && texture_dimension % 2 == 0
        && texture_count(texture_dimension / 2, packing_degree, required_bucket_capacity)
            <= texture_count(texture_dimension, packing_degree, required_bucket_capacity)
    {
        texture_dimension /= 2;
    }

    let count = texture_count(texture_dimension, packing_degree, required_bucket_capacity);
    let plan = PackingPlan {
        texture_dimension,
        texture_count: u32::try_from(count).unwrap_or(u32::MAX),
        packing_degree,
    };

    log::trace!(
        "[TextureBudget] {:?}: {} channels, {} x {}² (packing {})",
        element_class,
        channel_count(byte_count, packing_degree, element_class),
        plan.texture_count,
        plan.texture_dimension,
        plan.packing_degree
    );

    plan
}

fn required_texture_slots(per_layer: &BTreeMap<LayerId, PackingPlan>) -> u64 {
    let data_textures: u64 = per_layer.values().map(|plan| plan.texture_count as u64).sum();
    per_layer.len() as u64 * LOOKUP_TEXTURES_PER_LAYER as u64 + data_textures
}

fn derive_supported_features(
    limits: &CapabilityLimits,
    per_layer: &BTreeMap<LayerId, PackingPlan>,
    has_segmentation: bool,
) -> FeatureSupport {
    let necessary = required_texture_slots(per_layer);
    let available = limits.max_bound_textures as u64;

    // Mapping textures are optional, so they are counted separately and only
    // matter when there is something to map.
    let not_enough_for_mapping = necessary + MAPPING_TEXTURE_COUNT as u64 > available;

    FeatureSupport {
        basic_rendering_supported: necessary <= available,
        id_mapping_supported: !(has_segmentation && not_enough_for_mapping),
    }
}

fn smallest_common_bucket_capacity(per_layer: &BTreeMap<LayerId, PackingPlan>) -> u64 {
    per_layer
        .values()
        .map(PackingPlan::bucket_capacity)
        .min()
        .unwrap_or(0)
}

/// Plan the data textures for every layer.
///
/// Fails only when the hardware is below the minimum requirements.
pub fn plan(
    limits: &CapabilityLimits,
    layers: &[LayerDescriptor],
    required_bucket_capacity: u32,
    has_segmentation: bool,
) -> PlannerResult<TextureSetup> {
    validate_minimum_requirements(limits)?;

    let per_layer: BTreeMap<LayerId, PackingPlan> = layers
        .iter()
        .map(|layer| {
            let plan = plan_layer(
                limits,
                layer.element_byte_count,
                layer.element_class,
                required_bucket_capacity,
            );
            (layer.id.clone(), plan)
        })
        .collect();

    let features = derive_supported_features(limits, &per_layer, has_segmentation);
    let shared_bucket_capacity = smallest_common_bucket_capacity(&per_layer);

    if !features.basic_rendering_supported {
        log::warn!(
            "[TextureBudget] {} texture slots required but only {} available",
            required_texture_slots(&per_layer),
            limits.max_bound_textures
        );
    }

    Ok(TextureSetup {
        per_layer,
        features,
        shared_bucket_capacity,
    })
}
