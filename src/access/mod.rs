//! Data access for tasks and categories.
//!
//! Thin functions over an injected [`RemoteStore`](crate::remote::RemoteStore):
//! build a scoped query, run it, map rows to records. Errors from the store
//! are returned as-is.

pub mod categories;
pub mod tasks;
