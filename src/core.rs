use std::fmt::{self, Debug, Display};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// Atomic reference-counted string type used for identifiers.
pub(crate) type ArcStr = Arc<str>;

/// A 32-byte BLAKE3 hash used as a structural fingerprint.
///
/// Digests are computed over the shape of nested sets and providers, never
/// over file contents. Two independently built values with identical structure
/// hash to the same digest, which makes it usable as a cache key across
/// builds.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Hash32([u8; 32]);

impl<T> From<T> for Hash32
where
    T: Into<[u8; 32]>,
{
    fn from(value: T) -> Self {
        Hash32(value.into())
    }
}

impl Hash32 {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(self) -> String {
        const HEX: &[u8; 16] = b"0123456789abcdef";
        let mut acc = String::with_capacity(64);

        for &byte in &self.0 {
            acc.push(HEX[(byte >> 4) as usize] as char);
            acc.push(HEX[(byte & 0xF) as usize] as char);
        }

        acc
    }
}

impl Debug for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash32({})", self.to_hex())
    }
}

impl Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Adapter feeding `std::hash::Hash` implementations into BLAKE3.
#[derive(Default)]
pub(crate) struct Blake3Hasher(blake3::Hasher);

impl Blake3Hasher {
    pub(crate) fn update(&mut self, bytes: &[u8]) -> &mut Self {
        self.0.update(bytes);
        self
    }
}

impl From<Blake3Hasher> for Hash32 {
    fn from(value: Blake3Hasher) -> Self {
        let bytes: [u8; 32] = value.0.finalize().into();
        Hash32::from(bytes)
    }
}

impl Hasher for Blake3Hasher {
    fn finish(&self) -> u64 {
        let mut output = [0u8; 8];
        self.0.finalize_xof().fill(&mut output);
        u64::from_le_bytes(output)
    }

    fn write(&mut self, bytes: &[u8]) {
        self.0.update(bytes);
    }
}

/// Identifier of a build-graph node, e.g. `//java/com/example:lib`.
///
/// Labels are opaque to this crate: they are compared and hashed by their
/// textual form and never parsed.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Label(ArcStr);

impl Label {
    pub fn new(label: impl AsRef<str>) -> Self {
        Self(Arc::from(label.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Label({})", self.0)
    }
}

impl Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Label {
    fn from(value: &str) -> Self {
        Label::new(value)
    }
}

impl From<String> for Label {
    fn from(value: String) -> Self {
        Self(value.into())
    }
}

impl AsRef<str> for Label {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(PartialEq, Eq, Hash, Serialize, Deserialize)]
struct ArtifactData {
    path: Utf8PathBuf,
    owner: Option<Label>,
}

/// A reference to a build artifact such as a class jar, an interface jar or a
/// source jar.
///
/// This is only a handle: identity is the execution-root relative path plus
/// the label of the target that generates it. Cloning is cheap.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Artifact(Arc<ArtifactData>);

impl Artifact {
    /// A source artifact, not generated by any target.
    pub fn source(path: impl Into<Utf8PathBuf>) -> Self {
        Self(Arc::new(ArtifactData {
            path: path.into(),
            owner: None,
        }))
    }

    /// An artifact generated by the target `owner`.
    pub fn derived(path: impl Into<Utf8PathBuf>, owner: impl Into<Label>) -> Self {
        Self(Arc::new(ArtifactData {
            path: path.into(),
            owner: Some(owner.into()),
        }))
    }

    pub fn path(&self) -> &Utf8Path {
        &self.0.path
    }

    pub fn owner(&self) -> Option<&Label> {
        self.0.owner.as_ref()
    }

    pub fn file_name(&self) -> Option<&str> {
        self.0.path.file_name()
    }

    /// True when both handles point at the same allocation.
    pub fn ptr_eq(&self, other: &Artifact) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.owner {
            Some(owner) => write!(f, "Artifact({} <- {})", self.0.path, owner),
            None => write!(f, "Artifact({})", self.0.path),
        }
    }
}

impl Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.path.as_str())
    }
}

/// Helper used by the digest code: hash any `Hash` value through BLAKE3.
pub(crate) fn digest_of<T: Hash + ?Sized>(value: &T) -> Hash32 {
    let mut hasher = Blake3Hasher::default();
    value.hash(&mut hasher);
    hasher.into()
}
