//! Core types and traits for fitfind
//!
//! This crate contains domain types shared across all other crates.

mod api_trait;
mod collection;
pub mod constants;
mod env_config;
mod error;
mod history;
mod identity;
mod pagination;
mod product;
mod search;
mod wishlist;

pub use api_trait::*;
pub use collection::*;
pub use env_config::*;
pub use error::*;
pub use history::*;
pub use identity::*;
pub use pagination::*;
pub use product::*;
pub use search::*;
pub use wishlist::*;
