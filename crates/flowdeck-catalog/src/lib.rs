//! Agent catalog over HTTP.
//!
//! The catalog service exposes two listings, `{agents: [...]}` and
//! `{categories: [...]}`. [`HttpCatalog`] implements
//! [`flowdeck_core::traits::CatalogSource`] on top of them.

pub mod client;

pub use client::{AgentsResponse, CategoriesResponse, HttpCatalog};
