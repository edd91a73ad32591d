//! Predicates, ordering and windowing for child listings.
//!
//! The tree itself never interprets predicates; they are handed to the store collaborator,
//! which either evaluates them ([`docnest-memory`]) or translates them into its own query
//! language ([`docnest-mongodb`]) through a [`PredicateVisitor`].
//!
//! ```ignore
//! use docnest::query::{Filter, SortDirection};
//!
//! let cheap_widgets = collection
//!     .query()
//!     .filter(Filter::eq("kind", "widget").and(Filter::lt("price", 10)))
//!     .sort("price", SortDirection::Asc)
//!     .limit(20);
//! ```

use bson::Bson;

use crate::error::StoreError;

/// Comparison operators of a field predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Substring of a string field, or element of an array field.
    Contains,
    StartsWith,
    EndsWith,
    /// The field (or one of its elements) equals one of the given values.
    AnyOf,
}

/// A boolean predicate over a payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    /// Field presence (`true`) or absence (`false`).
    Exists(String, bool),
    Field {
        field: String,
        op: FieldOp,
        value: Bson,
    },
}

impl Predicate {
    /// Conjunction, flattening into an existing `And`.
    pub fn and(self, other: Predicate) -> Self {
        match self {
            Predicate::And(mut all) => {
                all.push(other);
                Predicate::And(all)
            }
            _ => Predicate::And(vec![self, other]),
        }
    }

    /// Disjunction, flattening into an existing `Or`.
    pub fn or(self, other: Predicate) -> Self {
        match self {
            Predicate::Or(mut any) => {
                any.push(other);
                Predicate::Or(any)
            }
            _ => Predicate::Or(vec![self, other]),
        }
    }

    /// Negation.
    pub fn not(self) -> Self {
        Predicate::Not(Box::new(self))
    }
}

/// Constructors for field predicates.
pub struct Filter;

impl Filter {
    fn field(field: impl Into<String>, op: FieldOp, value: impl Into<Bson>) -> Predicate {
        Predicate::Field { field: field.into(), op, value: value.into() }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Predicate {
        Self::field(field, FieldOp::Eq, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Predicate {
        Self::field(field, FieldOp::Ne, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Predicate {
        Self::field(field, FieldOp::Gt, value)
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Predicate {
        Self::field(field, FieldOp::Gte, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Predicate {
        Self::field(field, FieldOp::Lt, value)
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Predicate {
        Self::field(field, FieldOp::Lte, value)
    }

    pub fn contains(field: impl Into<String>, value: impl Into<Bson>) -> Predicate {
        Self::field(field, FieldOp::Contains, value)
    }

    pub fn starts_with(field: impl Into<String>, value: impl Into<String>) -> Predicate {
        Self::field(field, FieldOp::StartsWith, value.into())
    }

    pub fn ends_with(field: impl Into<String>, value: impl Into<String>) -> Predicate {
        Self::field(field, FieldOp::EndsWith, value.into())
    }

    pub fn any_of<V: Into<Bson>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Predicate {
        let values = values
            .into_iter()
            .map(Into::into)
            .collect::<Vec<Bson>>();

        Self::field(field, FieldOp::AnyOf, values)
    }

    pub fn exists(field: impl Into<String>) -> Predicate {
        Predicate::Exists(field.into(), true)
    }

    pub fn missing(field: impl Into<String>) -> Predicate {
        Predicate::Exists(field.into(), false)
    }

    pub fn all(predicates: impl IntoIterator<Item = Predicate>) -> Predicate {
        Predicate::And(predicates.into_iter().collect())
    }

    pub fn any(predicates: impl IntoIterator<Item = Predicate>) -> Predicate {
        Predicate::Or(predicates.into_iter().collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

/// A predicate plus ordering and windowing, handed to `query_children`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub predicate: Option<Predicate>,
    pub sort: Option<Sort>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` when the query selects every child in store order.
    pub fn is_unconstrained(&self) -> bool {
        self.predicate.is_none()
            && self.sort.is_none()
            && self.offset.is_none()
            && self.limit.is_none()
    }

    /// Applies `offset` and `limit` to an already filtered and sorted sequence.
    pub fn window<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset.unwrap_or(0))
            .take(self.limit.unwrap_or(usize::MAX))
            .collect()
    }
}

/// Walks a [`Predicate`] tree. Backends implement this to evaluate or translate predicates.
pub trait PredicateVisitor {
    type Output;
    type Error: Into<StoreError>;

    fn visit_and(&mut self, all: &[Predicate]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, any: &[Predicate]) -> Result<Self::Output, Self::Error>;
    fn visit_not(&mut self, inner: &Predicate) -> Result<Self::Output, Self::Error>;
    fn visit_exists(&mut self, field: &str, present: bool) -> Result<Self::Output, Self::Error>;
    fn visit_field(&mut self, field: &str, op: FieldOp, value: &Bson) -> Result<Self::Output, Self::Error>;

    fn visit(&mut self, predicate: &Predicate) -> Result<Self::Output, Self::Error> {
        match predicate {
            Predicate::And(all) => self.visit_and(all),
            Predicate::Or(any) => self.visit_or(any),
            Predicate::Not(inner) => self.visit_not(inner),
            Predicate::Exists(field, present) => self.visit_exists(field, *present),
            Predicate::Field { field, op, value } => self.visit_field(field, *op, value),
        }
    }
}
