use std::fmt;

use super::wire::{RequestBucketInfo, SendBucketInfo};
use crate::constants::BUCKET_WIDTH;
use crate::error::AddressError;

/// Zoomed bucket address: a cube in the grid of one resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BucketAddress {
    pub x: u32,
    pub y: u32,
    pub z: u32,
    pub zoom_step: u32,
}

impl BucketAddress {
    pub fn new(x: u32, y: u32, z: u32, zoom_step: u32) -> Self {
        Self { x, y, z, zoom_step }
    }
}

impl From<[u32; 4]> for BucketAddress {
    fn from([x, y, z, zoom_step]: [u32; 4]) -> Self {
        Self::new(x, y, z, zoom_step)
    }
}

impl fmt::Display for BucketAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}, {}]", self.x, self.y, self.z, self.zoom_step)
    }
}

/// Global voxel position of a bucket's origin. Fails if the zoom step has no
/// resolution or the position does not fit in 32 bits.
pub fn bucket_position_to_global_address(
    address: &BucketAddress,
    resolutions: &[[u32; 3]],
) -> Result<[u32; 3], AddressError> {
    let [rx, ry, rz] = *resolutions
        .get(address.zoom_step as usize)
        .ok_or(AddressError::UnknownResolution {
            zoom_step: address.zoom_step,
        })?;

    let scale = |coordinate: u32, resolution: u32| {
        coordinate
            .checked_mul(BUCKET_WIDTH)
            .and_then(|voxels| voxels.checked_mul(resolution))
            .ok_or_else(|| AddressError::OutOfRange {
                address: address.to_string(),
            })
    };

    Ok([
        scale(address.x, rx)?,
        scale(address.y, ry)?,
        scale(address.z, rz)?,
    ])
}

pub fn create_send_bucket_info(
    address: &BucketAddress,
    resolutions: &[[u32; 3]],
) -> Result<SendBucketInfo, AddressError> {
    Ok(SendBucketInfo {
        position: bucket_position_to_global_address(address, resolutions)?,
        zoom_step: address.zoom_step,
        cube_size: BUCKET_WIDTH,
    })
}

pub fn create_request_bucket_info(
    address: &BucketAddress,
    resolutions: &[[u32; 3]],
    four_bit: bool,
    version: Option<u64>,
) -> Result<RequestBucketInfo, AddressError> {
    Ok(RequestBucketInfo {
        bucket: create_send_bucket_info(address, resolutions)?,
        four_bit,
        version,
    })
}
