//! Structural hashing of canonical subtrees

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::NodeKind;

/// Bottom-up hash over kind, label and ordered child hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructuralHash(pub u64);

impl fmt::Display for StructuralHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// What part of a node's label enters its hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelKey<'a> {
    None,
    Text(&'a str),
    /// Scope coordinate of a local binding: hops outward, then declaration slot.
    Local { hops: u32, slot: u32 },
}

impl StructuralHash {
    pub fn compute(kind: NodeKind, label: LabelKey<'_>, children: &[StructuralHash]) -> Self {
        let mut fnv = Fnv64::new();
        fnv.write_str(kind.as_str());
        match label {
            LabelKey::None => fnv.write(&[0]),
            LabelKey::Text(text) => {
                fnv.write(&[1]);
                fnv.write_str(text);
            }
            LabelKey::Local { hops, slot } => {
                fnv.write(&[2]);
                fnv.write(&hops.to_le_bytes());
                fnv.write(&slot.to_le_bytes());
            }
        }
        fnv.write(&(children.len() as u64).to_le_bytes());
        for child in children {
            fnv.write(&child.0.to_le_bytes());
        }
        StructuralHash(fnv.finish())
    }

    /// Hash over kinds only, used to detect label-only edits.
    pub fn shape(kind: NodeKind, children: &[StructuralHash]) -> Self {
        Self::compute(kind, LabelKey::None, children)
    }
}

/// 64-bit FNV-1a over explicit little-endian bytes, so hashes are the same
/// on every platform and toolchain.
struct Fnv64(u64);

impl Fnv64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    fn new() -> Self {
        Fnv64(Self::OFFSET)
    }

    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.0 ^= u64::from(*byte);
            self.0 = self.0.wrapping_mul(Self::PRIME);
        }
    }

    /// Length-prefixed, so adjacent strings cannot run together.
    fn write_str(&mut self, text: &str) {
        self.write(&(text.len() as u64).to_le_bytes());
        self.write(text.as_bytes());
    }

    fn finish(&self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_order_sensitive() {
        let a = StructuralHash::compute(NodeKind::Identifier, LabelKey::Text("a"), &[]);
        let b = StructuralHash::compute(NodeKind::Identifier, LabelKey::Text("b"), &[]);
        let ab = StructuralHash::compute(NodeKind::Arguments, LabelKey::None, &[a, b]);
        let ba = StructuralHash::compute(NodeKind::Arguments, LabelKey::None, &[b, a]);
        assert_ne!(ab, ba);
    }

    #[test]
    fn test_fnv_matches_reference_vectors() {
        let mut empty = Fnv64::new();
        empty.write(b"");
        assert_eq!(empty.finish(), 0xcbf2_9ce4_8422_2325);
        let mut a = Fnv64::new();
        a.write(b"a");
        assert_eq!(a.finish(), 0xaf63_dc4c_8601_ec8c);
    }

    #[test]
    fn test_hash_is_deterministic() {
        let leaf = StructuralHash::compute(NodeKind::Identifier, LabelKey::Text("x"), &[]);
        assert_eq!(leaf, StructuralHash::compute(NodeKind::Identifier, LabelKey::Text("x"), &[]));
        let parent = StructuralHash::compute(NodeKind::Return, LabelKey::None, &[leaf]);
        assert_ne!(parent, leaf);
        assert_eq!(format!("{}", parent).len(), 16);
    }

    #[test]
    fn test_label_and_local_keys_differ() {
        let named = StructuralHash::compute(NodeKind::Identifier, LabelKey::Text("x"), &[]);
        let local = StructuralHash::compute(NodeKind::Identifier, LabelKey::Local { hops: 0, slot: 0 }, &[]);
        assert_ne!(named, local);
        assert_eq!(
            StructuralHash::shape(NodeKind::Identifier, &[]),
            StructuralHash::compute(NodeKind::Identifier, LabelKey::None, &[])
        );
    }
}
