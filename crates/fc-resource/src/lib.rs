//! `fc-resource`: tradeable resources and the buffers agents keep them in.
//!
//! | Module          | Contents                                               |
//! |-----------------|--------------------------------------------------------|
//! | [`composition`] | `Composition`, `CompMap`, `Nuc`                        |
//! | [`resource`]    | `Resource` trait, `ResourceKind`, `Material`, `Product` |
//! | [`buf`]         | `ResourceBuf`, `PopOrder`                              |
//!
//! Ownership of a resource object is plain Rust ownership: a value lives in
//! exactly one `ResourceBuf` (or is in flight inside a trade response), so a
//! resource can never be referenced by two buffers at once.

pub mod buf;
pub mod composition;
pub mod resource;

#[cfg(test)]
mod tests;

pub use buf::{PopOrder, ResourceBuf};
pub use composition::{CompMap, Composition, Nuc};
pub use resource::{Material, Product, Resource, ResourceKind};
