//! Payload codecs used on the bucket transport
//!
//! Four-bit transfer packs two voxels into one byte, keeping only the high
//! nibble of each 8-bit value. Pushed buckets travel as standard base64.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::WorkerError;

/// Expand four-bit data to one byte per voxel. Each nibble lands in the
/// high half of its output byte.
pub fn decode_four_bit(packed: &[u8]) -> Vec<u8> {
    let mut voxels = Vec::with_capacity(packed.len() * 2);
    for &byte in packed {
        voxels.push(byte & 0b1111_0000);
        voxels.push(byte << 4);
    }
    voxels
}

/// Pack pairs of 8-bit voxels into four-bit data. Low nibbles are dropped.
pub fn encode_four_bit(voxels: &[u8]) -> Result<Vec<u8>, WorkerError> {
    if voxels.len() % 2 != 0 {
        return Err(WorkerError::InvalidInput(format!(
            "four-bit packing needs an even voxel count, got {}",
            voxels.len()
        )));
    }

    Ok(voxels
        .chunks_exact(2)
        .map(|pair| (pair[0] & 0b1111_0000) | (pair[1] >> 4))
        .collect())
}

pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn decode_base64(text: &str) -> Result<Vec<u8>, WorkerError> {
    STANDARD
        .decode(text)
        .map_err(|err| WorkerError::InvalidInput(err.to_string()))
}
