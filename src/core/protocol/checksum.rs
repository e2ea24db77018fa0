//! Frame checksum
//!
//! CRC-16 with polynomial 0x1021, processed MSB-first through a 256-entry
//! lookup table. Every frame in both directions is protected with it, seeded
//! with [`CHECKSUM_SEED`].

/// Initial value used for every frame checksum
pub const CHECKSUM_SEED: u16 = 0xFFFF;

/// Generator polynomial
const POLYNOMIAL: u16 = 0x1021;

/// Pre-computed table for polynomial 0x1021
static TABLE: [u16; 256] = build_table();

const fn build_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ POLYNOMIAL
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Running checksum over one or more byte ranges
///
/// Feeding `a` then `b` gives the same result as [`checksum`] over `a ++ b`,
/// which lets a header and its payload be covered without joining them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checksum {
    crc: u16,
}

impl Checksum {
    /// Start a new running checksum
    pub fn new(seed: u16) -> Self {
        Self { crc: seed }
    }

    /// Fold more bytes into the checksum
    #[must_use]
    pub fn update(mut self, data: &[u8]) -> Self {
        for &byte in data {
            let index = ((self.crc >> 8) as u8 ^ byte) as usize;
            self.crc = (self.crc << 8) ^ TABLE[index];
        }
        self
    }

    /// Current value
    pub fn finish(self) -> u16 {
        self.crc
    }
}

impl Default for Checksum {
    fn default() -> Self {
        Self::new(CHECKSUM_SEED)
    }
}

/// Calculate the checksum of `data` starting from `seed`
pub fn checksum(data: &[u8], seed: u16) -> u16 {
    Checksum::new(seed).update(data).finish()
}
