//! GPU capability probing
//!
//! The renderer only needs two numbers from the hardware: how large a single
//! texture may be and how many textures can be bound at once.

pub mod capabilities;

pub use capabilities::{
    probe_adapter, probe_default_adapter, validate_minimum_requirements, CapabilityLimits,
};
