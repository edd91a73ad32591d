//! The schema marker every payload type satisfies, and the built-in payload types.
//!
//! An [`Item`] exposes a mutable string identifier that is serialized under the `"id"` key
//! and can be default-constructed, which lets the hierarchy build placeholder payloads
//! (for example the default payload used by `ensure`) without per-type code.

use bson::{Bson, Document as BsonDocument, de::deserialize_from_bson, ser::serialize_to_bson};
use serde::{Deserialize, Serialize};
use serde_json::{Value, from_value, to_value};
use std::fmt::Debug;

use crate::error::{StoreError, StoreResult};

/// The key every payload stores its identifier under.
pub const ID_KEY: &str = "id";

/// Core trait that all payloads stored in the tree must implement.
///
/// Usually derived with `#[derive(Item)]` from the facade crate.
///
/// # Example
///
/// ```ignore
/// use docnest::item::Item;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// pub struct Widget {
///     pub id: String,
///     pub name: String,
/// }
///
/// impl Item for Widget {
///     fn id(&self) -> &str {
///         &self.id
///     }
///
///     fn set_id(&mut self, id: String) {
///         self.id = id;
///     }
/// }
/// ```
pub trait Item: Serialize + for<'de> Deserialize<'de> + Default + Clone + Debug + Send + Sync + 'static {
    /// Schemaless items accept any payload shape. Casting away from them is always allowed.
    const SCHEMALESS: bool = false;

    /// Returns the identifier, empty when the store has not assigned one yet.
    fn id(&self) -> &str;

    /// Replaces the identifier.
    fn set_id(&mut self, id: String);

    /// Builds a default payload bound to `id`.
    fn with_id(id: impl Into<String>) -> Self {
        let mut item = Self::default();
        item.set_id(id.into());
        item
    }
}

/// Conversion helpers available on every [`Item`].
pub trait ItemExt: Item {
    /// Serializes this item into a store payload.
    ///
    /// # Errors
    ///
    /// Fails with [`StoreError::Validation`] if the serialized form is not a document with a
    /// string `"id"` field, and with [`StoreError::Serialization`] if serialization fails.
    fn to_payload(&self) -> StoreResult<Bson>;

    /// Decodes an item from a store payload.
    fn from_payload(payload: Bson) -> StoreResult<Self>;

    /// Converts this item to a JSON value.
    fn to_json(&self) -> StoreResult<Value>;

    /// Creates an item from a JSON value.
    fn from_json(value: Value) -> StoreResult<Self>;
}

impl<I: Item> ItemExt for I {
    fn to_payload(&self) -> StoreResult<Bson> {
        let mut payload = serialize_to_bson(self)?;

        let document = payload
            .as_document_mut()
            .ok_or_else(|| StoreError::Validation(format!("{} does not serialize to a document", std::any::type_name::<I>())))?;

        let has_string_id = document
            .get(ID_KEY)
            .map(|value| matches!(value, Bson::String(_)));

        match has_string_id {
            Some(true) => {}
            None if I::SCHEMALESS => {
                document.insert(ID_KEY, self.id());
            }
            _ => {
                return Err(StoreError::Validation(format!(
                    "{} does not expose a string `{ID_KEY}` field",
                    std::any::type_name::<I>()
                )));
            }
        }

        Ok(payload)
    }

    fn from_payload(payload: Bson) -> StoreResult<Self> {
        Ok(deserialize_from_bson(payload)?)
    }

    fn to_json(&self) -> StoreResult<Value> {
        Ok(to_value(self)?)
    }

    fn from_json(value: Value) -> StoreResult<Self> {
        Ok(from_value(value)?)
    }
}

/// Reads the identifier of a raw payload.
pub fn payload_id(payload: &Bson) -> Option<&str> {
    payload
        .as_document()?
        .get_str(ID_KEY)
        .ok()
}

/// Untyped payload: any BSON document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawItem(pub BsonDocument);

impl Item for RawItem {
    const SCHEMALESS: bool = true;

    fn id(&self) -> &str {
        self.0.get_str(ID_KEY).unwrap_or_default()
    }

    fn set_id(&mut self, id: String) {
        self.0.insert(ID_KEY, id);
    }
}

/// Metadata of the account, as reported by the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub id: String,
}

impl Item for AccountInfo {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

/// Payload of a database.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    pub id: String,
}

impl Item for DatabaseInfo {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

/// Payload of a collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub id: String,
    /// Tag of the item schema the collection was created for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

impl Item for CollectionInfo {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct Nameless {
        name: String,
    }

    impl Item for Nameless {
        fn id(&self) -> &str {
            ""
        }

        fn set_id(&mut self, _id: String) {}
    }

    #[test]
    fn with_id_binds_a_default_payload() {
        let info = CollectionInfo::with_id("items");

        assert_eq!(info.id, "items");
        assert_eq!(info.schema, None);
    }

    #[test]
    fn payload_carries_the_id_key() {
        let payload = DatabaseInfo::with_id("orders").to_payload().unwrap();

        assert_eq!(payload_id(&payload), Some("orders"));
        assert_eq!(DatabaseInfo::from_payload(payload).unwrap(), DatabaseInfo::with_id("orders"));
    }

    #[test]
    fn types_without_an_id_field_fail_validation() {
        let result = Nameless::default().to_payload();

        assert!(matches!(result, Err(StoreError::Validation(_))));
    }

    #[test]
    fn raw_items_get_an_id_slot() {
        let payload = RawItem(doc! { "name": "widget" }).to_payload().unwrap();

        assert_eq!(payload_id(&payload), Some(""));

        let mut raw = RawItem::default();
        raw.set_id("a1".into());
        assert_eq!(raw.id(), "a1");
    }

    #[test]
    fn json_conversion_keeps_fields() {
        let info = CollectionInfo { id: "items".into(), schema: Some("Widget".into()) };
        let json = info.to_json().unwrap();

        assert_eq!(json["schema"], "Widget");
        assert_eq!(CollectionInfo::from_json(json).unwrap(), info);
    }
}
