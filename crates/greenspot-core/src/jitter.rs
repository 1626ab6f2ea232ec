//! Deterministic jitter for per-zone price and availability variation
//!
//! Identical inputs always produce identical jitter. The hash is 64-bit FNV-1a
//! over the key parts joined with a `|` separator.

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a hash of the given key parts
pub fn fnv1a(parts: &[&str]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hash ^= u64::from(b'|');
            hash = hash.wrapping_mul(FNV_PRIME);
        }
        for byte in part.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    }
    hash
}

/// Map the key parts to a value in `[0, 1)`
pub fn unit_jitter(parts: &[&str]) -> f64 {
    // 53 bits fit exactly in an f64 mantissa
    (fnv1a(parts) >> 11) as f64 / (1u64 << 53) as f64
}

/// Map the key parts to a value in `[-amplitude, +amplitude)`
pub fn symmetric_jitter(parts: &[&str], amplitude: f64) -> f64 {
    (unit_jitter(parts) * 2.0 - 1.0) * amplitude
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv1a_known_vectors() {
        assert_eq!(fnv1a(&[""]), FNV_OFFSET_BASIS);
        assert_eq!(fnv1a(&["a"]), 0xaf63_dc4c_8601_ec8c);
        assert_eq!(fnv1a(&["foobar"]), 0x8594_4171_f739_67e8);
    }

    #[test]
    fn test_jitter_is_deterministic() {
        let a = symmetric_jitter(&["eu-north-1a", "g4dn.xlarge", "13"], 0.08);
        let b = symmetric_jitter(&["eu-north-1a", "g4dn.xlarge", "13"], 0.08);
        assert_eq!(a, b);
    }

    #[test]
    fn test_separator_distinguishes_keys() {
        assert_ne!(fnv1a(&["ab", "c"]), fnv1a(&["a", "bc"]));
    }

    #[test]
    fn test_jitter_range() {
        for hour in 0..24 {
            let h = hour.to_string();
            let u = unit_jitter(&["us-east-1b", "p4d.24xlarge", &h]);
            assert!((0.0..1.0).contains(&u));
            let s = symmetric_jitter(&["us-east-1b", "p4d.24xlarge", &h], 0.08);
            assert!((-0.08..0.08).contains(&s));
        }
    }
}
