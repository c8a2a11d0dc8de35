//! Implementation of the `#[derive(Recordable)]` macro.
//!
//! This module generates recording stand-ins from struct definitions so
//! that query conditions can name fields through ordinary method calls.

mod attrs;
mod derive;

pub use derive::recordable_derive_impl;
