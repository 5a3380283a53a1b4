//! Newsdesk - A News Front End
//!
//! This crate lists, filters, searches, favorites, creates and edits news
//! articles held by an external REST backend. Favorites fall back to a local
//! SQLite snapshot when the backend is unreachable.

pub mod api;
pub mod config;
pub mod error;
pub mod favorites;
pub mod filter;
pub mod model;
pub mod routes;
pub mod snapshot;
pub mod store;
pub mod validate;
