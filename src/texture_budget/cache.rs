use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHasher;

use super::planner::{plan, TextureSetup};
use crate::error::PlannerResult;
use crate::gpu::CapabilityLimits;
use crate::layer::LayerDescriptor;

/// Structural hash of every planner input
pub fn setup_key(
    limits: &CapabilityLimits,
    layers: &[LayerDescriptor],
    required_bucket_capacity: u32,
    has_segmentation: bool,
) -> u64 {
    let mut hasher = FxHasher::default();
    limits.hash(&mut hasher);
    layers.hash(&mut hasher);
    required_bucket_capacity.hash(&mut hasher);
    has_segmentation.hash(&mut hasher);
    hasher.finish()
}

struct CachedSetup {
    key: u64,
    limits: CapabilityLimits,
    layers: Vec<LayerDescriptor>,
    setup: Arc<TextureSetup>,
}

/// Memoizes the last texture setup.
///
/// Any change to the limits, the layer set or the requested capacity
/// produces a different key and forces a recomputation.
#[derive(Default)]
pub struct TextureSetupCache {
    entry: Mutex<Option<CachedSetup>>,
    recomputations: AtomicU64,
}

impl TextureSetupCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_plan(
        &self,
        limits: &CapabilityLimits,
        layers: &[LayerDescriptor],
        required_bucket_capacity: u32,
        has_segmentation: bool,
    ) -> PlannerResult<Arc<TextureSetup>> {
        let key = setup_key(limits, layers, required_bucket_capacity, has_segmentation);
        let mut entry = self.entry.lock();

        if let Some(cached) = entry.as_ref() {
            if cached.key == key && cached.limits == *limits && cached.layers == layers {
                return Ok(cached.setup.clone());
            }
        }

        let setup = Arc::new(plan(limits, layers, required_bucket_capacity, has_segmentation)?);
        self.recomputations.fetch_add(1, Ordering::Relaxed);
        log::debug!(
            "[TextureBudget] Recomputed setup for {} layers (shared capacity {})",
            layers.len(),
            setup.shared_bucket_capacity
        );

        *entry = Some(CachedSetup {
            key,
            limits: *limits,
            layers: layers.to_vec(),
            setup: setup.clone(),
        });
        Ok(setup)
    }

    pub fn invalidate(&self) {
        *self.entry.lock() = None;
    }

    /// How often the planner actually ran
    pub fn recomputations(&self) -> u64 {
        self.recomputations.load(Ordering::Relaxed)
    }
}
