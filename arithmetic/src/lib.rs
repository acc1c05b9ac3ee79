use easy_ext::ext;

#[ext(U64Ext)]
pub impl u64 {
    fn is_multiple_of(self, other: impl Into<Self>) -> bool {
        let other = other.into();
        other != 0 && self % other == 0
    }

    fn div_typenum_or(self, other: u64, fallback: Self) -> Self {
        if other == 0 {
            fallback
        } else {
            self / other
        }
    }
}

#[ext(NonZeroExt)]
pub impl core::num::NonZeroU64 {
    fn is_multiple(self, value: u64) -> bool {
        value != 0 && value % self.get() == 0
    }
}

/// Two's-complement cast used by the era archive codec to compute record offsets
/// that may be negative relative to the index record's own position.
#[must_use]
pub const fn wrapping_i64_to_u64(value: i64) -> u64 {
    value as u64
}

#[must_use]
pub const fn wrapping_u64_to_i64(value: u64) -> i64 {
    value as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiple_of_examples() {
        assert!(64_u64.is_multiple_of(32_u64));
        assert!(!65_u64.is_multiple_of(32_u64));
    }

    #[test]
    fn wrapping_roundtrip() {
        let original: i64 = -17;
        let as_u64 = wrapping_i64_to_u64(original);
        assert_eq!(wrapping_u64_to_i64(as_u64), original);
    }
}
