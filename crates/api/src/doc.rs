//! Documentation module for rquery.
//!
//! High-level documentation that defines terms and aids navigation of the
//! other modules.

pub mod glossary;
