//! Resource diff module.
//!
//! This module matches the resources of a base and a head snapshot by
//! identity and classifies them as added, removed or modified.

mod compare;
mod engine;
mod identity;
mod summary;

pub use crate::error::Side;
pub use compare::{DuplicatePolicy, PayloadComparator};
pub use engine::DiffEngine;
pub use identity::{IdentityKey, IdentityPolicy};
pub use summary::{Duplicate, Modification, Summary};
