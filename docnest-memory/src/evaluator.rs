//! Predicate evaluation and ordering over in-memory payloads.

use bson::{Bson, Document as BsonDocument, datetime::DateTime};
use std::{cmp::Ordering, collections::HashMap};

use docnest_core::{
    error::StoreError,
    query::{FieldOp, Predicate, PredicateVisitor, Sort, SortDirection},
};

/// Normalized view of a BSON value for comparisons. Integers and floats compare as `f64`.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(DateTime),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(f64::from(*value)),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(values) => Comparable::Array(values.iter().map(Comparable::from).collect()),
            Bson::Document(document) => Comparable::Map(
                document
                    .iter()
                    .map(|(key, value)| (key.as_str(), Comparable::from(value)))
                    .collect(),
            ),
            // Everything else compares as null
            _ => Comparable::Null,
        }
    }
}

impl PartialEq for Comparable<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Comparable<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Resolves a dotted field path (`"address.city"`) inside a payload.
pub(crate) fn lookup<'a>(document: &'a BsonDocument, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;

    for segment in segments {
        current = current.as_document()?.get(segment)?;
    }

    Some(current)
}

/// Evaluates a predicate against one payload.
pub(crate) struct PayloadEvaluator<'a> {
    payload: &'a BsonDocument,
}

impl<'a> PayloadEvaluator<'a> {
    pub fn new(payload: &'a BsonDocument) -> Self {
        Self { payload }
    }

    pub fn matches(payload: &'a BsonDocument, predicate: &Predicate) -> Result<bool, StoreError> {
        Self::new(payload).visit(predicate)
    }
}

impl PredicateVisitor for PayloadEvaluator<'_> {
    type Output = bool;
    type Error = StoreError;

    fn visit_and(&mut self, all: &[Predicate]) -> Result<bool, StoreError> {
        for predicate in all {
            if !self.visit(predicate)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, any: &[Predicate]) -> Result<bool, StoreError> {
        for predicate in any {
            if self.visit(predicate)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, inner: &Predicate) -> Result<bool, StoreError> {
        Ok(!self.visit(inner)?)
    }

    fn visit_exists(&mut self, field: &str, present: bool) -> Result<bool, StoreError> {
        Ok(lookup(self.payload, field).is_some() == present)
    }

    fn visit_field(&mut self, field: &str, op: FieldOp, value: &Bson) -> Result<bool, StoreError> {
        let Some(field_value) = lookup(self.payload, field) else {
            // A missing field only satisfies "not equal"
            return Ok(op == FieldOp::Ne);
        };

        let left = Comparable::from(field_value);
        let right = Comparable::from(value);

        Ok(match op {
            FieldOp::Eq => left == right,
            FieldOp::Ne => left != right,
            FieldOp::Gt => left.partial_cmp(&right) == Some(Ordering::Greater),
            FieldOp::Gte => matches!(left.partial_cmp(&right), Some(Ordering::Greater | Ordering::Equal)),
            FieldOp::Lt => left.partial_cmp(&right) == Some(Ordering::Less),
            FieldOp::Lte => matches!(left.partial_cmp(&right), Some(Ordering::Less | Ordering::Equal)),
            FieldOp::Contains => match (&left, &right) {
                (Comparable::Array(items), needle) => items.iter().any(|item| item == needle),
                (Comparable::String(haystack), Comparable::String(needle)) => haystack.contains(*needle),
                _ => false,
            },
            FieldOp::StartsWith => match (&left, &right) {
                (Comparable::String(text), Comparable::String(prefix)) => text.starts_with(*prefix),
                _ => false,
            },
            FieldOp::EndsWith => match (&left, &right) {
                (Comparable::String(text), Comparable::String(suffix)) => text.ends_with(*suffix),
                _ => false,
            },
            FieldOp::AnyOf => match (&left, &right) {
                (Comparable::Array(items), Comparable::Array(candidates)) => {
                    candidates.iter().any(|candidate| items.contains(candidate))
                }
                (single, Comparable::Array(candidates)) => candidates.contains(single),
                (Comparable::Array(items), single) => items.contains(single),
                (single, other) => single == other,
            },
        })
    }
}

/// Orders payloads by `sort`. Payloads missing the field, or holding values that do not
/// compare, keep their relative order.
pub(crate) fn sort_payloads(payloads: &mut [BsonDocument], sort: &Sort) {
    payloads.sort_by(|a, b| {
        let left = lookup(a, &sort.field)
            .map(Comparable::from)
            .unwrap_or(Comparable::Null);
        let right = lookup(b, &sort.field)
            .map(Comparable::from)
            .unwrap_or(Comparable::Null);

        let ordering = left
            .partial_cmp(&right)
            .unwrap_or(Ordering::Equal);

        match sort.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use docnest_core::query::Filter;

    fn widget() -> BsonDocument {
        doc! {
            "id": "a1",
            "name": "widget",
            "price": 12,
            "tags": ["blue", "small"],
            "dims": { "width": 4.5 },
        }
    }

    fn check(predicate: Predicate) -> bool {
        PayloadEvaluator::matches(&widget(), &predicate).unwrap()
    }

    #[test]
    fn comparisons_normalize_numbers() {
        assert!(check(Filter::eq("price", 12.0)));
        assert!(check(Filter::gt("price", 10_i64)));
        assert!(check(Filter::lte("price", 12)));
        assert!(!check(Filter::lt("price", 12)));
    }

    #[test]
    fn string_and_array_operators() {
        assert!(check(Filter::contains("name", "dg")));
        assert!(check(Filter::contains("tags", "blue")));
        assert!(check(Filter::starts_with("name", "wid")));
        assert!(check(Filter::ends_with("name", "get")));
        assert!(check(Filter::any_of("tags", ["red", "small"])));
        assert!(check(Filter::any_of("name", ["gadget", "widget"])));
        assert!(!check(Filter::any_of("name", ["gadget"])));
    }

    #[test]
    fn dotted_paths_reach_nested_fields() {
        assert!(check(Filter::gt("dims.width", 4)));
        assert!(check(Filter::exists("dims.width")));
        assert!(check(Filter::missing("dims.height")));
    }

    #[test]
    fn missing_fields_only_match_not_equal() {
        assert!(check(Filter::ne("color", "red")));
        assert!(!check(Filter::eq("color", "red")));
        assert!(!check(Filter::gt("color", 1)));
    }

    #[test]
    fn combinators() {
        assert!(check(Filter::eq("name", "widget").and(Filter::gt("price", 5))));
        assert!(check(Filter::eq("name", "gadget").or(Filter::contains("tags", "small"))));
        assert!(check(Filter::eq("name", "gadget").not()));
        assert!(!check(Filter::all([Filter::eq("name", "widget"), Filter::eq("price", 1)])));
    }

    #[test]
    fn sort_orders_by_field_in_either_direction() {
        let mut payloads = vec![doc! { "n": 2 }, doc! { "n": 3 }, doc! { "n": 1 }];

        sort_payloads(&mut payloads, &Sort { field: "n".into(), direction: SortDirection::Asc });
        assert_eq!(payloads.iter().map(|p| p.get_i32("n").unwrap()).collect::<Vec<_>>(), vec![1, 2, 3]);

        sort_payloads(&mut payloads, &Sort { field: "n".into(), direction: SortDirection::Desc });
        assert_eq!(payloads.iter().map(|p| p.get_i32("n").unwrap()).collect::<Vec<_>>(), vec![3, 2, 1]);
    }
}
