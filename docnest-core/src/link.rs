//! Canonical addresses of resources in the tree.
//!
//! A [`Link`] is computed purely from the ancestor chain of a resource:
//!
//! ```text
//! Link(account)  = ""
//! Link(database) = "/dbs/{id}"
//! Link(coll)     = Link(database) + "/colls/{id}"
//! Link(doc)      = Link(coll) + "/docs/{id}"
//! ```
//!
//! Computing a link never touches the store.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{StoreError, StoreResult};

/// The four levels of the resource tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// The root of the tree. Never created by this crate.
    Account,
    /// A database owned by the account.
    Database,
    /// A collection owned by a database.
    Collection,
    /// A document owned by a collection.
    Document,
}

impl ResourceKind {
    const LEVELS: [ResourceKind; 4] = [
        ResourceKind::Account,
        ResourceKind::Database,
        ResourceKind::Collection,
        ResourceKind::Document,
    ];

    /// The path segment that precedes identifiers of this kind, or `None` for the account.
    pub fn segment(self) -> Option<&'static str> {
        match self {
            ResourceKind::Account => None,
            ResourceKind::Database => Some("dbs"),
            ResourceKind::Collection => Some("colls"),
            ResourceKind::Document => Some("docs"),
        }
    }

    /// The kind of resources owned by this kind.
    pub fn child(self) -> Option<ResourceKind> {
        Self::LEVELS.get(self.depth() + 1).copied()
    }

    /// The kind of the owning resource.
    pub fn parent(self) -> Option<ResourceKind> {
        self.depth()
            .checked_sub(1)
            .map(|depth| Self::LEVELS[depth])
    }

    fn depth(self) -> usize {
        match self {
            ResourceKind::Account => 0,
            ResourceKind::Database => 1,
            ResourceKind::Collection => 2,
            ResourceKind::Document => 3,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Account => "account",
            ResourceKind::Database => "database",
            ResourceKind::Collection => "collection",
            ResourceKind::Document => "document",
        };

        f.write_str(name)
    }
}

/// Canonical hierarchical address of a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Link(String);

impl Link {
    /// Characters that may not appear in an identifier.
    pub const RESERVED: [char; 4] = ['/', '\\', '?', '#'];

    /// The account link, root of every other link.
    pub fn root() -> Self {
        Link(String::new())
    }

    /// Appends `/{segment(kind)}/{id}` to this link.
    ///
    /// This is the pure link resolver used by the hierarchy wrappers; it performs no validation.
    pub(crate) fn join(&self, kind: ResourceKind, id: &str) -> Link {
        let segment = kind.segment().unwrap_or_default();
        Link(format!("{}/{}/{}", self.0, segment, id))
    }

    /// Returns the link of the child `id` below this link.
    ///
    /// # Errors
    ///
    /// Fails with [`StoreError::Validation`] if `id` is not a valid identifier or this
    /// link addresses a document (documents have no children).
    pub fn child(&self, id: &str) -> StoreResult<Link> {
        validate_id(id)?;

        let kind = self
            .kind()
            .child()
            .ok_or_else(|| StoreError::Validation(format!("{} {} cannot own children", self.kind(), self)))?;

        Ok(self.join(kind, id))
    }

    /// Parses a link string, checking segment names and identifiers.
    pub fn parse(value: &str) -> StoreResult<Link> {
        if value.is_empty() {
            return Ok(Link::root());
        }

        let rest = value
            .strip_prefix('/')
            .ok_or_else(|| StoreError::Validation(format!("link must start with '/': {value}")))?;
        let parts = rest.split('/').collect::<Vec<_>>();

        if parts.len() % 2 != 0 || parts.len() > 6 {
            return Err(StoreError::Validation(format!("malformed link: {value}")));
        }

        let mut link = Link::root();

        for pair in parts.chunks(2) {
            let expected = link
                .kind()
                .child()
                .and_then(ResourceKind::segment)
                .unwrap_or_default();

            if pair[0] != expected {
                return Err(StoreError::Validation(format!(
                    "expected segment '{expected}' in {value}, found '{}'",
                    pair[0]
                )));
            }

            link = link.child(pair[1])?;
        }

        Ok(link)
    }

    /// Returns `true` for the account link.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the link as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The kind of resource this link addresses.
    pub fn kind(&self) -> ResourceKind {
        let depth = self.0.matches('/').count() / 2;
        ResourceKind::LEVELS
            .get(depth)
            .copied()
            .unwrap_or(ResourceKind::Document)
    }

    /// The identifier of the addressed resource, `None` for the account.
    pub fn id(&self) -> Option<&str> {
        if self.is_root() {
            return None;
        }

        self.0.rsplit('/').next()
    }

    /// The link of the owning resource, `None` for the account.
    pub fn parent(&self) -> Option<Link> {
        if self.is_root() {
            return None;
        }

        let without_id = &self.0[..self.0.rfind('/')?];
        let without_segment = &without_id[..without_id.rfind('/')?];

        Some(Link(without_segment.to_string()))
    }

    /// Identifiers along the path, outermost first.
    ///
    /// # Errors
    ///
    /// Fails with [`StoreError::Validation`] if the link does not follow the
    /// `/dbs/{id}/colls/{id}/docs/{id}` shape, which happens when a handle was bound to an id
    /// containing a reserved character.
    pub fn components(&self) -> StoreResult<Vec<(ResourceKind, &str)>> {
        let malformed = || StoreError::Validation(format!("malformed link: {}", self.0));

        let mut parts = self.0.split('/').skip(1);
        let mut components = Vec::new();

        while let Some(segment) = parts.next() {
            let kind = ResourceKind::LEVELS
                .get(components.len() + 1)
                .copied()
                .filter(|kind| kind.segment() == Some(segment))
                .ok_or_else(malformed)?;
            let id = parts.next().ok_or_else(malformed)?;

            validate_id(id)?;
            components.push((kind, id));
        }

        Ok(components)
    }

    /// Returns `true` if `ancestor` is a proper prefix of this link in the tree.
    pub fn is_descendant_of(&self, ancestor: &Link) -> bool {
        if ancestor.is_root() {
            return !self.is_root();
        }

        self.0.len() > ancestor.0.len()
            && self.0.starts_with(&ancestor.0)
            && self.0.as_bytes()[ancestor.0.len()] == b'/'
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str("/");
        }

        f.write_str(&self.0)
    }
}

/// Checks that `id` can be used as a resource identifier.
pub fn validate_id(id: &str) -> StoreResult<()> {
    if id.is_empty() {
        return Err(StoreError::Validation("identifier must not be empty".into()));
    }

    if let Some(c) = id.chars().find(|c| Link::RESERVED.contains(c)) {
        return Err(StoreError::Validation(format!("identifier {id:?} contains reserved character {c:?}")));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders_item_link() -> Link {
        Link::root()
            .child("orders")
            .and_then(|db| db.child("items"))
            .and_then(|coll| coll.child("a1"))
            .unwrap()
    }

    #[test]
    fn child_appends_kind_segment_and_id() {
        let db = Link::root().child("orders").unwrap();
        let coll = db.child("items").unwrap();

        assert_eq!(db.as_str(), "/dbs/orders");
        assert_eq!(coll.as_str(), format!("{}/colls/items", db.as_str()));
        assert_eq!(orders_item_link().as_str(), "/dbs/orders/colls/items/docs/a1");
    }

    #[test]
    fn kind_id_and_parent_follow_the_path() {
        let doc = orders_item_link();

        assert_eq!(doc.kind(), ResourceKind::Document);
        assert_eq!(doc.id(), Some("a1"));

        let coll = doc.parent().unwrap();
        assert_eq!(coll.kind(), ResourceKind::Collection);
        assert_eq!(coll.id(), Some("items"));

        let db = coll.parent().unwrap();
        assert_eq!(db.as_str(), "/dbs/orders");
        assert_eq!(db.parent(), Some(Link::root()));
        assert_eq!(Link::root().parent(), None);
        assert_eq!(Link::root().id(), None);
        assert_eq!(Link::root().kind(), ResourceKind::Account);
    }

    #[test]
    fn documents_cannot_own_children() {
        assert!(matches!(orders_item_link().child("x"), Err(StoreError::Validation(_))));
    }

    #[test]
    fn reserved_characters_are_rejected() {
        assert!(validate_id("a/b").is_err());
        assert!(validate_id("a?b").is_err());
        assert!(validate_id("").is_err());
        assert!(validate_id("widget-01").is_ok());
    }

    #[test]
    fn parse_accepts_canonical_links_only() {
        assert_eq!(Link::parse("/dbs/orders/colls/items/docs/a1").unwrap(), orders_item_link());
        assert_eq!(Link::parse("").unwrap(), Link::root());
        assert!(Link::parse("/colls/items").is_err());
        assert!(Link::parse("dbs/orders").is_err());
        assert!(Link::parse("/dbs/orders/colls").is_err());
    }

    #[test]
    fn components_list_each_level() {
        assert_eq!(
            orders_item_link().components().unwrap(),
            vec![
                (ResourceKind::Database, "orders"),
                (ResourceKind::Collection, "items"),
                (ResourceKind::Document, "a1"),
            ]
        );
        assert!(Link::root().components().unwrap().is_empty());
    }

    #[test]
    fn components_reject_links_built_from_reserved_ids() {
        let deep = Link::root().join(ResourceKind::Database, "a/b/c/d/e/f/g/h");
        assert!(matches!(deep.components(), Err(StoreError::Validation(_))));

        let odd = Link::root().join(ResourceKind::Database, "a/b");
        assert!(matches!(odd.components(), Err(StoreError::Validation(_))));

        let queried = Link::root().join(ResourceKind::Database, "a?b");
        assert!(matches!(queried.components(), Err(StoreError::Validation(_))));
    }

    #[test]
    fn descendants_are_detected_on_segment_boundaries() {
        let db = Link::root().child("orders").unwrap();
        let other = Link::root().child("orders2").unwrap();

        assert!(orders_item_link().is_descendant_of(&db));
        assert!(orders_item_link().is_descendant_of(&Link::root()));
        assert!(!other.is_descendant_of(&db));
        assert!(!db.is_descendant_of(&db));
    }

    #[test]
    fn kinds_chain_both_ways() {
        assert_eq!(ResourceKind::Account.child(), Some(ResourceKind::Database));
        assert_eq!(ResourceKind::Document.child(), None);
        assert_eq!(ResourceKind::Collection.parent(), Some(ResourceKind::Database));
        assert_eq!(ResourceKind::Account.parent(), None);
    }
}
