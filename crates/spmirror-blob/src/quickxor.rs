//! OneDrive/SharePoint-compatible QuickXorHash
//!
//! The algorithm works on a 160-bit (20-byte) hash state. Each input byte is
//! XOR-ed into the state at the current *bit* position and the position
//! advances by 11 bits (mod 160). After all input the total length (as a
//! little-endian `u64`) is XOR-ed into the first 8 bytes of the state. The
//! 20-byte result is conventionally base64-encoded, which is how Graph
//! reports it in the `hashes.quickXorHash` facet.

use base64::Engine;

/// Streaming QuickXorHash state.
#[derive(Debug, Clone)]
pub struct QuickXorHash {
    data: [u8; 20],
    shift: usize,
    length: u64,
}

impl QuickXorHash {
    /// Width of the hash in bits.
    const WIDTH_BITS: usize = 160;

    /// Number of bits the position advances per input byte.
    const SHIFT_STEP: usize = 11;

    pub fn new() -> Self {
        Self {
            data: [0u8; 20],
            shift: 0,
            length: 0,
        }
    }

    /// Absorb a chunk of input.
    pub fn update(&mut self, input: &[u8]) {
        for &byte in input {
            let byte_pos = self.shift / 8;
            let bit_offset = self.shift % 8;

            self.data[byte_pos % 20] ^= byte << bit_offset;
            if bit_offset > 0 {
                self.data[(byte_pos + 1) % 20] ^= byte >> (8 - bit_offset);
            }

            self.shift = (self.shift + Self::SHIFT_STEP) % Self::WIDTH_BITS;
        }
        self.length += input.len() as u64;
    }

    /// Finish and return the raw 20-byte digest.
    pub fn finalize(mut self) -> [u8; 20] {
        // XOR the total length (little-endian u64) into the first 8 bytes.
        let length_bytes = self.length.to_le_bytes();
        for (i, &lb) in length_bytes.iter().enumerate() {
            self.data[i] ^= lb;
        }
        self.data
    }

    /// Finish and return the base64 digest as Graph reports it.
    pub fn finalize_base64(self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.finalize())
    }

    /// One-shot convenience over a full buffer.
    pub fn hash_base64(input: &[u8]) -> String {
        let mut hasher = Self::new();
        hasher.update(input);
        hasher.finalize_base64()
    }
}

impl Default for QuickXorHash {
    fn default() -> Self {
        Self::new()
    }
}
