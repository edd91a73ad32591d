//! Structural refinement check behind `cast`.
//!
//! A target schema `U` refines a source schema `S` when a payload shaped like `S` can be read
//! as `U`: every field `U` requires exists in `S` with a compatible type, and any field `U`
//! adds carries a serde default. The probe is `S::default()`, so the check needs no I/O and
//! says nothing about payloads already stored.

use std::any::type_name;

use crate::{
    error::{StoreError, StoreResult},
    item::{Item, ItemExt},
};

pub(crate) fn check_refinement<S: Item, U: Item>() -> StoreResult<()> {
    if S::SCHEMALESS || U::SCHEMALESS {
        return Ok(());
    }

    let incompatible = |reason: String| StoreError::CastIncompatible {
        from: type_name::<S>(),
        to: type_name::<U>(),
        reason,
    };

    let probe = S::default()
        .to_payload()
        .map_err(|err| incompatible(err.to_string()))?;

    U::from_payload(probe)
        .map(|_| ())
        .map_err(|err| incompatible(err.to_string()))
}
