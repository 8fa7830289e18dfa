//! Aggregation: priority-ordered merge, wide mode, identity keys.
//!
//! This module walks providers in the caller's priority order, keeps the
//! first record seen for each identity key, stops once the target is met,
//! and offers a wide mode that repeats the walk across a fixed city list
//! under one shared seen-set.

pub mod aggregate;
pub mod identity;
pub mod wide;
