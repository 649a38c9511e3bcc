//! Container backends.
//!
//! The launcher core drives any [`crate::container::Container`]; this
//! module provides the built-in file-backed reference backend used by the
//! command binary and the end-to-end tests. Production embedders supply
//! their own factory.

mod store;

pub use store::{StoreContainer, StoreContainerFactory};
