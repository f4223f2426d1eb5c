//! Texture budget report for a dataset configuration
//!
//! Usage: texture-budget [config.toml]

use bucket_stream::gpu::probe_default_adapter;
use bucket_stream::texture_budget::{gpu_factors_with_labels, TextureSetupCache};
use bucket_stream::{CapabilityLimits, StreamingConfig};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    if let Err(e) = run() {
        log::error!("Texture budget check failed: {}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading configuration from {}", path);
            StreamingConfig::load(&path)?
        }
        None => {
            log::info!("No configuration given, using defaults");
            StreamingConfig::default()
        }
    };

    let limits = match pollster::block_on(probe_default_adapter()) {
        Ok(limits) => limits,
        Err(e) => {
            log::warn!("{}, assuming headless limits", e);
            CapabilityLimits::headless()
        }
    };

    println!("=== Texture Budget ===");
    println!(
        "Max texture dimension: {}, bound textures: {}",
        limits.max_texture_dimension, limits.max_bound_textures
    );

    let dataset = &config.dataset;
    let pipeline = &config.pipeline;
    let cache = TextureSetupCache::new();
    let setup = cache.get_or_plan(
        &limits,
        &dataset.layers,
        pipeline.required_bucket_capacity,
        dataset.has_segmentation(),
    )?;

    for layer in &dataset.layers {
        if let Some(plan) = setup.plan_for(&layer.id) {
            println!(
                "  {:<20} {:?}: {} x {}^2 (packing {}), {} buckets",
                layer.name(),
                layer.element_class,
                plan.texture_count,
                plan.texture_dimension,
                plan.packing_degree,
                plan.bucket_capacity()
            );
        }
    }

    println!("Shared bucket capacity: {}", setup.shared_bucket_capacity);
    println!(
        "Texture slots: {} of {}",
        setup.required_texture_slots(),
        limits.max_bound_textures
    );
    println!(
        "Basic rendering: {}, id mapping: {}",
        yes_no(setup.features.basic_rendering_supported),
        yes_no(setup.features.id_mapping_supported)
    );

    let factor = pipeline.gpu_factor;
    println!(
        "GPU factor {} ({}): lookup buffer {}, address space {:?}",
        factor.multiplier(),
        factor.label(),
        factor.lookup_buffer_size(),
        factor.address_space_dimensions()
    );

    log::debug!("Available GPU factors: {:?}", gpu_factors_with_labels());
    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
