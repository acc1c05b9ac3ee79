//! Types that do not appear on the wire but are load-bearing for dispatch and bookkeeping:
//! the fork tag used by the sum types in `combined`, and the Altair participation-flag byte.

use core::ops::{BitOr, BitOrAssign};

use ssz::{ReadError, Size, SszHash, SszRead, SszSize, SszWrite};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Phase0,
    Altair,
    Bellatrix,
}

impl Phase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Phase0 => "phase0",
            Self::Altair => "altair",
            Self::Bellatrix => "bellatrix",
        }
    }
}

/// One participation byte per validator (Altair onward), replacing Phase0's
/// `PendingAttestation` list. Bits 0-2 are `TIMELY_SOURCE`/`TIMELY_TARGET`/`TIMELY_HEAD`; the
/// remaining bits are unused and must stay clear.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParticipationFlags(u8);

impl ParticipationFlags {
    pub const TIMELY_SOURCE: u8 = 1 << 0;
    pub const TIMELY_TARGET: u8 = 1 << 1;
    pub const TIMELY_HEAD: u8 = 1 << 2;

    #[must_use]
    pub const fn new(bits: u8) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn has(self, flag: u8) -> bool {
        self.0 & flag == flag
    }

    #[must_use]
    pub fn with(self, flag: u8) -> Self {
        Self(self.0 | flag)
    }
}

impl BitOr for ParticipationFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ParticipationFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl SszSize for ParticipationFlags {
    const SIZE: Size = Size::Fixed(1);
}

impl SszWrite for ParticipationFlags {
    fn write_variable(&self, bytes: &mut Vec<u8>) {
        bytes.push(self.0);
    }
}

impl SszRead<()> for ParticipationFlags {
    fn from_ssz_unchecked(_context: &(), bytes: &[u8]) -> Result<Self, ReadError> {
        match bytes {
            [byte] => Ok(Self(*byte)),
            _ => Err(ReadError::WrongFixedLength {
                expected: 1,
                actual: bytes.len(),
            }),
        }
    }
}

impl SszHash for ParticipationFlags {
    fn hash_tree_root(&self) -> ethereum_types::H256 {
        self.0.hash_tree_root()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn participation_flags_accumulate() {
        let flags = ParticipationFlags::default()
            .with(ParticipationFlags::TIMELY_SOURCE)
            .with(ParticipationFlags::TIMELY_TARGET);

        assert!(flags.has(ParticipationFlags::TIMELY_SOURCE));
        assert!(flags.has(ParticipationFlags::TIMELY_TARGET));
        assert!(!flags.has(ParticipationFlags::TIMELY_HEAD));
    }
}
