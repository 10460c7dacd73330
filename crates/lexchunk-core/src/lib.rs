#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

//! lexchunk-core
//!
//! Types, configuration and the issue taxonomy shared by every stage of the
//! legal-document chunking pipeline (structure parsing, chunking, quality
//! gates and record mapping).

pub mod config;
pub mod data_processor;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Issue, Result, StructureError};
