//! Translation of predicates into MongoDB filter documents.

use bson::{Bson, Document, doc};

use docnest_core::{
    error::StoreError,
    item::ID_KEY,
    query::{FieldOp, Predicate, PredicateVisitor},
};

use crate::sanitizer::NameSanitizer;

/// Translates predicates into MongoDB's native filter syntax.
///
/// Field paths are dotted; each segment is escaped the way payload keys are stored, and the
/// `id` field maps to `_id`.
pub(crate) struct MongoQueryTranslator;

impl MongoQueryTranslator {
    pub(crate) fn field_path(field: &str) -> String {
        if field == ID_KEY {
            return "_id".to_string();
        }

        field
            .split('.')
            .map(NameSanitizer::key)
            .collect::<Vec<_>>()
            .join(".")
    }

    fn visit_all(&mut self, predicates: &[Predicate]) -> Result<Vec<Document>, StoreError> {
        predicates
            .iter()
            .map(|predicate| self.visit(predicate))
            .collect()
    }
}

/// Escapes regular expression metacharacters so `text` matches literally.
fn literal(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());

    for c in text.chars() {
        if "\\^$.|?*+()[]{}".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    escaped
}

impl PredicateVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = StoreError;

    fn visit_and(&mut self, all: &[Predicate]) -> Result<Document, StoreError> {
        Ok(doc! { "$and": self.visit_all(all)? })
    }

    fn visit_or(&mut self, any: &[Predicate]) -> Result<Document, StoreError> {
        Ok(doc! { "$or": self.visit_all(any)? })
    }

    fn visit_not(&mut self, inner: &Predicate) -> Result<Document, StoreError> {
        Ok(doc! { "$nor": [self.visit(inner)?] })
    }

    fn visit_exists(&mut self, field: &str, present: bool) -> Result<Document, StoreError> {
        let path = Self::field_path(field);
        Ok(doc! { path: { "$exists": present } })
    }

    fn visit_field(&mut self, field: &str, op: FieldOp, value: &Bson) -> Result<Document, StoreError> {
        let condition = match op {
            FieldOp::Eq => doc! { "$eq": value },
            FieldOp::Ne => doc! { "$ne": value },
            FieldOp::Gt => doc! { "$gt": value },
            FieldOp::Gte => doc! { "$gte": value },
            FieldOp::Lt => doc! { "$lt": value },
            FieldOp::Lte => doc! { "$lte": value },
            FieldOp::Contains => match value {
                Bson::String(text) => doc! { "$regex": literal(text) },
                other => doc! { "$elemMatch": { "$eq": other } },
            },
            FieldOp::StartsWith => match value {
                Bson::String(text) => doc! { "$regex": format!("^{}", literal(text)) },
                _ => return Err(StoreError::Validation("starts_with requires a string value".into())),
            },
            FieldOp::EndsWith => match value {
                Bson::String(text) => doc! { "$regex": format!("{}$", literal(text)) },
                _ => return Err(StoreError::Validation("ends_with requires a string value".into())),
            },
            FieldOp::AnyOf => match value {
                Bson::Array(_) => doc! { "$in": value },
                other => doc! { "$eq": other },
            },
        };

        let path = Self::field_path(field);
        Ok(doc! { path: condition })
    }
}
