//! Deterministic identifier generation.
//!
//! Xcode and Visual Studio documents cross-reference objects through opaque
//! identifiers. They are derived from a seed name and a running counter so
//! exporting the same project twice yields identical files.

/// FNV-1a style multiplicative hash over a byte string, 64-bit.
pub fn seeded_hash(seed: u64, data: &[u8]) -> u64 {
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = 0xcbf2_9ce4_8422_2325 ^ seed;
    for byte in data {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(PRIME);
    }
    // final avalanche so nearby counters differ in every nibble
    hash ^= hash >> 33;
    hash = hash.wrapping_mul(0xff51_afd7_ed55_8ccd);
    hash ^= hash >> 33;
    hash
}

/// Generates a stream of identifiers for one document.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    seed: String,
    counter: u64,
}

impl IdGenerator {
    /// Create a generator for the given seed name.
    pub fn new(seed: impl Into<String>) -> Self {
        IdGenerator {
            seed: seed.into(),
            counter: 0,
        }
    }

    fn next_pair(&mut self, salt: &str) -> (u64, u64) {
        self.counter += 1;
        let key = format!("{}\0{}\0{}", self.seed, salt, self.counter);
        let hi = seeded_hash(self.counter, key.as_bytes());
        let lo = seeded_hash(hi, key.as_bytes());
        (hi, lo)
    }

    /// Next Xcode object identifier: 24 upper-case hex digits.
    pub fn next_xcode_id(&mut self, salt: &str) -> String {
        let (hi, lo) = self.next_pair(salt);
        format!("{:016X}{:08X}", hi, lo as u32)
    }

    /// Next Visual Studio GUID in `{8-4-4-4-12}` upper-case form.
    pub fn next_guid(&mut self, salt: &str) -> String {
        let (hi, lo) = self.next_pair(salt);
        format!(
            "{{{:08X}-{:04X}-{:04X}-{:04X}-{:012X}}}",
            (hi >> 32) as u32,
            (hi >> 16) as u16,
            hi as u16,
            (lo >> 48) as u16,
            lo & 0xFFFF_FFFF_FFFF
        )
    }
}
