//! Scalar newtypes shared by every fork. Kept separate from the container modules because
//! almost every other module in the workspace needs them.

use derive_more::{Add, AddAssign, Display, From, Into, Sub, SubAssign};
use ssz::{ReadError, Size, SszHash, SszRead, SszSize, SszWrite};
use thiserror::Error;

pub use ethereum_types::H256;

/// A 32-byte Merkle root or block root. An alias rather than a newtype because SSZ containers
/// use `H256` directly in dozens of fields and a wrapper would just add noise.
pub type Root = H256;

pub type Gwei = u64;
pub type UnixSeconds = u64;
pub type NodeId = H256;
pub type ExecutionBlockHash = H256;
pub type ExecutionBlockNumber = u64;
pub type ExecutionAddress = [u8; 20];
pub type Version = [u8; 4];
pub type DomainType = [u8; 4];
pub type Domain = [u8; 32];
pub type ForkDigest = [u8; 4];

#[derive(
    Clone, Copy, Debug, Default, Display, PartialEq, Eq, PartialOrd, Ord, Hash, Add, Sub, AddAssign, SubAssign, From, Into,
)]
pub struct Slot(u64);

#[derive(
    Clone, Copy, Debug, Default, Display, PartialEq, Eq, PartialOrd, Ord, Hash, Add, Sub, AddAssign, SubAssign, From, Into,
)]
pub struct Epoch(u64);

impl Slot {
    #[must_use]
    pub const fn new(slot: u64) -> Self {
        Self(slot)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// `epoch = slot / SLOTS_PER_EPOCH`, per spec.md §3.
    #[must_use]
    pub fn epoch(self, slots_per_epoch: u64) -> Epoch {
        Epoch::new(self.0 / slots_per_epoch)
    }

    #[must_use]
    pub fn is_epoch_start(self, slots_per_epoch: u64) -> bool {
        self.0 % slots_per_epoch == 0
    }
}

impl Epoch {
    #[must_use]
    pub const fn new(epoch: u64) -> Self {
        Self(epoch)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn start_slot(self, slots_per_epoch: u64) -> Slot {
        Slot::new(self.0 * slots_per_epoch)
    }
}

macro_rules! impl_ssz_for_u64_newtype {
    ($type:ty) => {
        impl SszSize for $type {
            const SIZE: Size = Size::Fixed(8);
        }

        impl SszWrite for $type {
            fn write_variable(&self, bytes: &mut Vec<u8>) {
                self.0.write_variable(bytes);
            }
        }

        impl SszRead<()> for $type {
            fn from_ssz_unchecked(context: &(), bytes: &[u8]) -> Result<Self, ReadError> {
                u64::from_ssz_unchecked(context, bytes).map(Self)
            }
        }

        impl SszHash for $type {
            fn hash_tree_root(&self) -> H256 {
                self.0.hash_tree_root()
            }
        }
    };
}

impl_ssz_for_u64_newtype!(Slot);
impl_ssz_for_u64_newtype!(Epoch);

/// `ValidatorIndex < len(state.validators)` is enforced at every call site that looks one up
/// (spec.md §3 invariants), not baked into the type itself, since the bound depends on the
/// state the index is being resolved against.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into)]
pub struct ValidatorIndex(u32);

impl ValidatorIndex {
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl SszSize for ValidatorIndex {
    const SIZE: Size = Size::Fixed(4);
}

impl SszWrite for ValidatorIndex {
    fn write_variable(&self, bytes: &mut Vec<u8>) {
        self.0.write_variable(bytes);
    }
}

impl SszRead<()> for ValidatorIndex {
    fn from_ssz_unchecked(context: &(), bytes: &[u8]) -> Result<Self, ReadError> {
        u32::from_ssz_unchecked(context, bytes).map(Self)
    }
}

impl SszHash for ValidatorIndex {
    fn hash_tree_root(&self) -> H256 {
        self.0.hash_tree_root()
    }
}

impl From<ValidatorIndex> for usize {
    fn from(index: ValidatorIndex) -> Self {
        index.0 as Self
    }
}

#[derive(Debug, Error)]
#[error("value {value} does not fit in range [0, {limit})")]
pub struct RangeError {
    value: u64,
    limit: u64,
}

/// `CommitteeIndex` as described in spec.md §3: a small-range newtype with an explicit
/// `init` constructor so out-of-range values are rejected at the boundary instead of being
/// silently truncated.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, PartialOrd, Ord, Hash, Into)]
pub struct CommitteeIndex(u64);

impl CommitteeIndex {
    pub fn init(value: u64, committees_per_slot: u64) -> Result<Self, RangeError> {
        if value >= committees_per_slot {
            return Err(RangeError {
                value,
                limit: committees_per_slot,
            });
        }

        Ok(Self(value))
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl_ssz_for_u64_newtype!(CommitteeIndex);

#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, PartialOrd, Ord, Hash, Into)]
pub struct SubnetId(u64);

impl SubnetId {
    pub fn init(value: u64, subnet_count: u64) -> Result<Self, RangeError> {
        if value >= subnet_count {
            return Err(RangeError {
                value,
                limit: subnet_count,
            });
        }

        Ok(Self(value))
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into)]
pub struct PayloadId(u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_epoch_arithmetic() {
        assert_eq!(Slot::new(31).epoch(32), Epoch::new(0));
        assert_eq!(Slot::new(32).epoch(32), Epoch::new(1));
        assert!(Slot::new(32).is_epoch_start(32));
        assert!(!Slot::new(33).is_epoch_start(32));
    }

    #[test]
    fn committee_index_rejects_out_of_range() {
        assert!(CommitteeIndex::init(3, 4).is_ok());
        assert!(CommitteeIndex::init(4, 4).is_err());
    }
}
