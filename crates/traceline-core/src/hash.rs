//! FNV-1a hashing used for event identity and string-table aliases.
//!
//! FNV-1a is part of the wire contract: collectors recompute these values,
//! so the constants here must never change. It is fast and well distributed
//! but explicitly not a security boundary.

const FNV64_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV64_PRIME: u64 = 0x0000_0100_0000_01b3;

const FNV32_OFFSET: u32 = 0x811c_9dc5;
const FNV32_PRIME: u32 = 0x0100_0193;

/// 64-bit FNV-1a over a byte slice.
pub fn fnv1a_64(data: &[u8]) -> u64 {
    let mut hash = FNV64_OFFSET;
    for byte in data {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV64_PRIME);
    }
    hash
}

/// 32-bit FNV-1a over a byte slice.
pub fn fnv1a_32(data: &[u8]) -> u32 {
    let mut hash = FNV32_OFFSET;
    for byte in data {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(FNV32_PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv1a_32_known_values() {
        // Reference values shared with the collector side.
        assert_eq!(fnv1a_32(b"tagBoolean"), 3191348081);
        assert_eq!(fnv1a_32(b"tagInt"), 3350542684);
        assert_eq!(fnv1a_32(b"tagFloat"), 465169687);
        assert_eq!(fnv1a_32(b"tagString"), 1042072278);
        assert_eq!(fnv1a_32(b"tagBytes"), 1660915494);
    }

    #[test]
    fn test_fnv1a_64_is_stable() {
        let h1 = fnv1a_64(b"some event identity input");
        let h2 = fnv1a_64(b"some event identity input");
        assert_eq!(h1, h2);
        assert_ne!(fnv1a_64(b"a"), fnv1a_64(b"b"));
    }

    #[test]
    fn test_empty_input_yields_offset_basis() {
        assert_eq!(fnv1a_64(b""), 0xcbf29ce484222325);
        assert_eq!(fnv1a_32(b""), 0x811c9dc5);
    }
}
