//! Bookstore application library
//!
//! Catalog and order modules mounted by the bookstore HTTP server.

pub mod modules;

pub use modules::register_all;
