//! Escaping of identifiers and payload keys for MongoDB.
//!
//! Resource ids may contain characters MongoDB rejects in database names, collection names or
//! field names. Those characters are percent-escaped on the way in and restored on the way out.
//! `%` itself is always escaped, so the mapping is reversible.

use bson::{Bson, Document};

/// Name of the collection holding child records of the catalog and of every database.
pub(crate) const METADATA: &str = "_docnest";

/// Databases MongoDB keeps for itself. Matched without regard to case.
const SYSTEM_DATABASES: [&str; 3] = ["admin", "local", "config"];

/// Characters MongoDB rejects in database names.
const DATABASE_RESERVED: [char; 11] = ['%', '.', ' ', '"', '$', '*', '<', '>', ':', '|', '\0'];

/// Characters MongoDB rejects in collection names.
const COLLECTION_RESERVED: [char; 3] = ['%', '$', '\0'];

/// Characters MongoDB treats specially in field names.
const KEY_RESERVED: [char; 4] = ['%', '.', '$', '\0'];

pub(crate) struct NameSanitizer;

impl NameSanitizer {
    fn escape(input: &str, reserved: &[char]) -> String {
        let mut escaped = String::with_capacity(input.len());

        for c in input.chars() {
            if reserved.contains(&c) {
                escaped.push_str(&Self::escape_char(c));
            } else {
                escaped.push(c);
            }
        }

        escaped
    }

    /// Reverts [`NameSanitizer::escape`] for any reserved set.
    pub(crate) fn restore(input: &str) -> String {
        let mut restored = String::with_capacity(input.len());
        let mut rest = input;

        while let Some(index) = rest.find('%') {
            restored.push_str(&rest[..index]);

            let code = rest
                .get(index + 1..index + 3)
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .and_then(char::from_u32);

            match code {
                Some(c) => {
                    restored.push(c);
                    rest = &rest[index + 3..];
                }
                None => {
                    restored.push('%');
                    rest = &rest[index + 1..];
                }
            }
        }

        restored.push_str(rest);
        restored
    }

    /// Name of the database holding the records of an account's databases.
    ///
    /// It starts with [`METADATA`], a prefix [`NameSanitizer::database`] never produces.
    pub(crate) fn catalog(account: &str) -> String {
        format!("{METADATA}-{}", Self::escape(account, &DATABASE_RESERVED))
    }

    /// Escapes a database id. Ids that would name a MongoDB system database or start with the
    /// catalog prefix get their first character escaped.
    pub(crate) fn database(id: &str) -> String {
        let escaped = Self::escape(id, &DATABASE_RESERVED);

        let shadows_system = SYSTEM_DATABASES
            .iter()
            .any(|name| name.eq_ignore_ascii_case(&escaped));
        let shadows_catalog = escaped
            .get(..METADATA.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(METADATA));

        if shadows_system || shadows_catalog {
            return Self::escape_first(&escaped);
        }

        escaped
    }

    /// Escapes a collection id. Names MongoDB reserves (`system.*`) and the metadata collection
    /// get their first character escaped.
    pub(crate) fn collection(id: &str) -> String {
        let escaped = Self::escape(id, &COLLECTION_RESERVED);

        if escaped.starts_with("system.") || escaped == METADATA {
            return Self::escape_first(&escaped);
        }

        escaped
    }

    fn escape_first(name: &str) -> String {
        let mut chars = name.chars();
        let first = chars.next().map(Self::escape_char).unwrap_or_default();
        format!("{first}{}", chars.as_str())
    }

    fn escape_char(c: char) -> String {
        format!("%{:02X}", c as u32)
    }

    pub(crate) fn key(key: &str) -> String {
        Self::escape(key, &KEY_RESERVED)
    }

    /// Escapes every key of a document, recursively.
    pub(crate) fn sanitize_keys(document: Document) -> Document {
        document
            .into_iter()
            .map(|(key, value)| (Self::key(&key), Self::map_documents(value, Self::sanitize_keys)))
            .collect()
    }

    /// Restores every key of a document, recursively.
    pub(crate) fn restore_keys(document: Document) -> Document {
        document
            .into_iter()
            .map(|(key, value)| (Self::restore(&key), Self::map_documents(value, Self::restore_keys)))
            .collect()
    }

    fn map_documents(value: Bson, f: fn(Document) -> Document) -> Bson {
        match value {
            Bson::Document(document) => Bson::Document(f(document)),
            Bson::Array(values) => Bson::Array(
                values
                    .into_iter()
                    .map(|value| Self::map_documents(value, f))
                    .collect(),
            ),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn database_names_escape_reserved_characters() {
        assert_eq!(NameSanitizer::database("orders"), "orders");
        assert_eq!(NameSanitizer::database("v1.2 eu"), "v1%2E2%20eu");
        assert_eq!(NameSanitizer::restore("v1%2E2%20eu"), "v1.2 eu");
    }

    #[test]
    fn database_ids_never_name_the_catalog_or_a_system_database() {
        let catalog = NameSanitizer::catalog("docnest");
        assert_eq!(catalog, "_docnest-docnest");

        for id in ["docnest", "_docnest", "_docnest-docnest", "_DocNest-docnest"] {
            let name = NameSanitizer::database(id);
            assert_ne!(name, catalog);
            assert!(!name.to_ascii_lowercase().starts_with(METADATA), "{id} maps to {name}");
            assert_eq!(NameSanitizer::restore(&name), id);
        }

        assert_eq!(NameSanitizer::database("admin"), "%61dmin");
        assert_eq!(NameSanitizer::database("Local"), "%4Cocal");
        assert_eq!(NameSanitizer::database("config"), "%63onfig");
        assert_eq!(NameSanitizer::restore("%61dmin"), "admin");
        assert_eq!(NameSanitizer::database("administration"), "administration");
    }

    #[test]
    fn percent_signs_round_trip() {
        let escaped = NameSanitizer::collection("100%");

        assert_eq!(escaped, "100%25");
        assert_eq!(NameSanitizer::restore(&escaped), "100%");
    }

    #[test]
    fn reserved_collection_names_are_escaped() {
        assert_eq!(NameSanitizer::collection("system.users"), "%73ystem.users");
        assert_eq!(NameSanitizer::collection(METADATA), "%5Fdocnest");
        assert_eq!(NameSanitizer::collection("items"), "items");
    }

    #[test]
    fn nested_keys_are_escaped_and_restored() {
        let payload = doc! { "a.b": 1, "list": [{ "$x": true }], "plain": "a.b" };
        let sanitized = NameSanitizer::sanitize_keys(payload.clone());

        assert!(sanitized.contains_key("a%2Eb"));
        assert_eq!(sanitized.get_str("plain").unwrap(), "a.b");
        assert_eq!(NameSanitizer::restore_keys(sanitized), payload);
    }
}
