// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Identifier and hashing utilities.
use blake3::Hasher;

/// Canonical 256-bit hash used for addressing scene objects and nodes.
pub type Hash = [u8; 32];

/// Strongly typed identifier for a transform in the scene.
///
/// Derived from a BLAKE3 hash of the object's name (see [`make_object_id`]),
/// so the same name always maps to the same id across runs.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ObjectId(pub Hash);

/// Strongly typed identifier for a constraint node in the scene.
///
/// Uses a different hash domain than [`ObjectId`] so a node and a transform
/// that share a name never collide.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct NodeId(pub Hash);

impl ObjectId {
    /// Returns the canonical byte representation of this id.
    #[must_use]
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }

    /// First eight bytes as lowercase hex, for log lines.
    #[must_use]
    pub fn short(&self) -> String {
        short_hex(&self.0)
    }
}

impl NodeId {
    /// Returns the canonical byte representation of this id.
    #[must_use]
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }

    /// First eight bytes as lowercase hex, for log lines.
    #[must_use]
    pub fn short(&self) -> String {
        short_hex(&self.0)
    }
}

fn short_hex(hash: &Hash) -> String {
    hash[..8].iter().map(|b| format!("{b:02x}")).collect()
}

/// Produces a stable object identifier: `blake3("object:" || name)`.
pub fn make_object_id(name: &str) -> ObjectId {
    let mut hasher = Hasher::new();
    hasher.update(b"object:");
    hasher.update(name.as_bytes());
    ObjectId(hasher.finalize().into())
}

/// Produces a stable node identifier: `blake3("node:" || name)`.
pub fn make_node_id(name: &str) -> NodeId {
    let mut hasher = Hasher::new();
    hasher.update(b"node:");
    hasher.update(name.as_bytes());
    NodeId(hasher.finalize().into())
}
