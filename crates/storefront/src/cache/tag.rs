//! Cache keys, tags and operation descriptors.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;

/// Identifies one cached read: the endpoint plus its argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    endpoint: Cow<'static, str>,
    arg: String,
}

impl QueryKey {
    /// Key for an endpoint called with `arg`.
    pub fn new(endpoint: impl Into<Cow<'static, str>>, arg: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            arg: arg.into(),
        }
    }

    /// Key for an endpoint that takes no argument.
    pub fn unit(endpoint: impl Into<Cow<'static, str>>) -> Self {
        Self::new(endpoint, String::new())
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[must_use]
    pub fn arg(&self) -> &str {
        &self.arg
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.endpoint, self.arg)
    }
}

/// A label linking cached reads to the writes that invalidate them.
///
/// Matching is exact: `Books` and `Books:42` are different tags. A query
/// that should be refreshed by any write to the type provides the bare
/// type tag as well as its id tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag {
    kind: Cow<'static, str>,
    id: Option<String>,
}

impl Tag {
    /// A type-wide tag, e.g. `Books`.
    pub fn kind(kind: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind: kind.into(),
            id: None,
        }
    }

    /// A tag for a single record, e.g. `Books:42`.
    pub fn with_id(kind: impl Into<Cow<'static, str>>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: Some(id.into()),
        }
    }

    #[must_use]
    pub fn tag_type(&self) -> &str {
        &self.kind
    }

    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}:{id}", self.kind),
            None => f.write_str(&self.kind),
        }
    }
}

/// A cached read and the tags its result provides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryDescriptor {
    pub key: QueryKey,
    pub provides: BTreeSet<Tag>,
}

impl QueryDescriptor {
    pub fn new(key: QueryKey, provides: impl IntoIterator<Item = Tag>) -> Self {
        Self {
            key,
            provides: provides.into_iter().collect(),
        }
    }
}

/// A write and the tags it invalidates on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationDescriptor {
    pub name: Cow<'static, str>,
    pub invalidates: BTreeSet<Tag>,
}

impl MutationDescriptor {
    pub fn new(name: impl Into<Cow<'static, str>>, invalidates: impl IntoIterator<Item = Tag>) -> Self {
        Self {
            name: name.into(),
            invalidates: invalidates.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_display() {
        assert_eq!(Tag::kind("Books").to_string(), "Books");
        assert_eq!(Tag::with_id("Books", "42").to_string(), "Books:42");
    }

    #[test]
    fn test_type_tag_and_id_tag_are_distinct() {
        assert_ne!(Tag::kind("Books"), Tag::with_id("Books", "42"));
        assert_eq!(Tag::with_id("Books", "42").tag_type(), "Books");
    }

    #[test]
    fn test_descriptor_dedups_tags() {
        let descriptor = QueryDescriptor::new(
            QueryKey::unit("fetchAllBooks"),
            [Tag::kind("Books"), Tag::kind("Books")],
        );
        assert_eq!(descriptor.provides.len(), 1);
        assert_eq!(descriptor.key.to_string(), "fetchAllBooks()");
    }
}
