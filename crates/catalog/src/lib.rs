//! `tradegate-catalog` — the product surface the order engine consumes.
//!
//! Catalog management (create/update/search) is an external collaborator; the
//! engine only resolves products and moves their stock.

pub mod product;

pub use product::Product;
