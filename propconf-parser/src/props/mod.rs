//! Main module for the properties reader and writer

pub mod context;
pub mod directives;
pub mod error;
pub mod includes;
pub mod lexing;
pub mod overrides;
pub mod parsing;
pub mod reader;
pub mod store;
pub mod units;
pub mod variants;
pub mod writer;
