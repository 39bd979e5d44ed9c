//! Schema-driven entity framework.
//!
//! Every document construct is described by a static [`Schema`]: a table of
//! attribute names and the [`Descriptor`] that interprets each of them. The
//! framework normalizes, validates and parses any construct from that table
//! alone.

mod descriptor;
mod entity;
mod range;

pub use descriptor::{Data, Descriptor, Section};
pub use entity::{Entity, Schema};
pub use range::{Bound, Range};
