// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::InternedString;
use crate::program::Expr;
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

/// A fixed-width fingerprint of renaming state.
///
/// Used to detect likely-equivalent symbolic states cheaply: digest equality is a
/// fast-path filter for state merging and redundant-path pruning, backed by the
/// collision resistance of the underlying hash, never a proof of equivalence on its own.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateDigest([u8; 32]);

impl StateDigest {
    /// Digest of a single (identifier, version, constant) binding.
    pub(crate) fn of_binding(
        identifier: InternedString,
        count: u64,
        constant: Option<&Expr>,
    ) -> Self {
        let mut hasher = Sha256::new();
        identifier.map(|s| hasher.update(s.as_bytes()));
        hasher.update([0u8]);
        hasher.update(count.to_le_bytes());
        match constant {
            Some(value) => {
                hasher.update([1u8]);
                hasher.update(format!("{value:?}").as_bytes());
            }
            None => hasher.update([0u8]),
        }
        StateDigest(hasher.finalize().into())
    }

    /// Combine per-binding digests into one state digest. The caller feeds them in a
    /// canonical order, so two states holding the same bindings digest identically no
    /// matter how they got there.
    pub(crate) fn aggregate(parts: impl Iterator<Item = StateDigest>) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part.0);
        }
        StateDigest(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for StateDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for StateDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateDigest({self})")
    }
}

/// Serialize as the hex rendering, which is what reporting output wants to show.
impl Serialize for StateDigest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_digests_separate_name_version_and_value() {
        let x: InternedString = "x!0".into();
        let y: InternedString = "y!0".into();
        let five = Expr::int_constant(5, crate::program::Type::signed_int(32));

        let base = StateDigest::of_binding(x, 1, None);
        assert_eq!(base, StateDigest::of_binding(x, 1, None));
        assert_ne!(base, StateDigest::of_binding(y, 1, None));
        assert_ne!(base, StateDigest::of_binding(x, 2, None));
        assert_ne!(base, StateDigest::of_binding(x, 1, Some(&five)));
    }

    #[test]
    fn hex_rendering() {
        let digest = StateDigest::of_binding("x!0".into(), 0, None);
        let hex = digest.to_string();
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
