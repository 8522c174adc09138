//! Synthetic references for overlay parts
//!
//! Parts created locally have no server id yet, so every addressable part
//! gets a reference assigned once when the overlay is entered:
//!
//! 1. an existing `ref` carried by the part
//! 2. the uuid of a hook
//! 3. the server id, as `id:<n>`
//! 4. a fresh ULID
//!
//! A candidate already handed out to another part of the same arena is
//! replaced by a fresh ULID.

use std::collections::HashSet;
use std::fmt;
use ulid::Ulid;

/// Reference to a part of a draft, stable for the life of the overlay
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SyntheticRef(String);

impl SyntheticRef {
    /// Reference derived from a server id
    #[inline]
    #[must_use]
    pub fn from_server_id(id: i64) -> Self {
        Self(format!("id:{id}"))
    }

    /// Wrap a reference string
    #[inline]
    #[must_use]
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Reference as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SyntheticRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SyntheticRef {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Hands out unique references within one arena
#[derive(Debug, Clone, Default)]
pub struct RefAllocator {
    issued: HashSet<SyntheticRef>,
}

impl RefAllocator {
    /// Create allocator with nothing issued
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick the reference of a part from what it already carries
    pub fn assign(
        &mut self,
        existing: Option<&str>,
        uuid: Option<&str>,
        server_id: Option<i64>,
    ) -> SyntheticRef {
        let candidate = existing
            .filter(|r| !r.is_empty())
            .or(uuid.filter(|u| !u.is_empty()))
            .map(SyntheticRef::new)
            .or_else(|| server_id.map(SyntheticRef::from_server_id));

        match candidate {
            Some(reference) if self.issued.insert(reference.clone()) => reference,
            Some(duplicate) => {
                tracing::debug!(%duplicate, "duplicate overlay ref, allocating a fresh one");
                self.fresh()
            }
            None => self.fresh(),
        }
    }

    /// Brand-new reference for a part created in the overlay
    pub fn fresh(&mut self) -> SyntheticRef {
        loop {
            let reference = SyntheticRef(Ulid::new().to_string());
            if self.issued.insert(reference.clone()) {
                return reference;
            }
        }
    }

    /// Forget a reference whose part was removed
    pub fn release(&mut self, reference: &SyntheticRef) {
        self.issued.remove(reference);
    }

    /// Number of live references
    #[must_use]
    pub fn len(&self) -> usize {
        self.issued.len()
    }

    /// Whether nothing was issued
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.issued.is_empty()
    }
}
