//! Core types and trait definitions for the Inkwell blogging platform.
//!
//! This crate is free of HTTP and database dependencies. Storage backends
//! implement [`store::BlogStore`]; the feed composer and the mutation actions
//! are written against that trait and take an explicit
//! [`context::RequestContext`].

pub mod actions;
pub mod comment;
pub mod context;
pub mod error;
pub mod feed;
pub mod follow;
pub mod group;
pub mod page;
pub mod post;
pub mod store;
pub mod user;

pub use error::{Error, Result};
