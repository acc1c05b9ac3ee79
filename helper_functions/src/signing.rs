//! Domain computation and signing roots (spec.md §6 domain constants, §4.2 `verify_block`'s
//! `skip_bls`-gated signature checks). Every signature verified anywhere in this workspace goes
//! through `compute_signing_root` with a domain built here.

use ssz::{Ssz, SszHash as _};
use types::primitives::{Domain, DomainType, ForkDigest, Root, Version, H256};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Ssz)]
struct ForkData {
    current_version: Version,
    genesis_validators_root: Root,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Ssz)]
struct SigningData {
    object_root: Root,
    domain: Domain,
}

/// `compute_fork_data_root` per spec.md §6 (used both for domains and for the 4-byte fork
/// digest that network subnets are namespaced by).
#[must_use]
pub fn compute_fork_data_root(current_version: Version, genesis_validators_root: Root) -> H256 {
    ForkData {
        current_version,
        genesis_validators_root,
    }
    .hash_tree_root()
}

#[must_use]
pub fn compute_fork_digest(current_version: Version, genesis_validators_root: Root) -> ForkDigest {
    let root = compute_fork_data_root(current_version, genesis_validators_root);
    let mut digest = [0; 4];
    digest.copy_from_slice(&root.as_bytes()[..4]);
    digest
}

/// `compute_domain`: `domain_type ++ compute_fork_data_root(...)[0..28]`.
#[must_use]
pub fn compute_domain(
    domain_type: DomainType,
    fork_version: Version,
    genesis_validators_root: Root,
) -> Domain {
    let fork_data_root = compute_fork_data_root(fork_version, genesis_validators_root);

    let mut domain = [0; 32];
    domain[..4].copy_from_slice(&domain_type);
    domain[4..].copy_from_slice(&fork_data_root.as_bytes()[..28]);

    domain
}

/// `compute_signing_root`: the actual message every BLS signature in the protocol is computed
/// over — the SSZ object's own root combined with the domain it was signed under.
#[must_use]
pub fn compute_signing_root(object_root: Root, domain: Domain) -> H256 {
    SigningData {
        object_root,
        domain,
    }
    .hash_tree_root()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_changes_with_fork_version() {
        let root = Root::repeat_byte(1);

        let mainnet = compute_domain([0, 0, 0, 0], [0, 0, 0, 0], root);
        let altair = compute_domain([0, 0, 0, 0], [1, 0, 0, 0], root);

        assert_ne!(mainnet, altair);
    }

    #[test]
    fn signing_root_changes_with_domain() {
        let object_root = Root::repeat_byte(2);
        let domain_a = [0; 32];
        let mut domain_b = [0; 32];
        domain_b[0] = 1;

        assert_ne!(
            compute_signing_root(object_root, domain_a),
            compute_signing_root(object_root, domain_b),
        );
    }
}
