pub mod controllers;
pub mod dag;
pub mod error;
pub mod models;
pub mod rest;
pub mod util;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{DecodeError, Error, Result};
