//! lexchunk-structure
//!
//! Recovers the Phần/Chương/Mục/Điều/Khoản/Điểm hierarchy from extracted
//! legal text. [`StructureDetector`] classifies single lines against a
//! per-document-type pattern table; [`StructureParser`] threads an explicit
//! open-node state through the lines and builds a [`HierarchyNode`] tree.

pub mod detector;
pub mod parser;
pub mod tree;

pub use detector::{detect, Heading, LineClass, StructureDetector};
pub use parser::{parse, StructureParser};
pub use tree::{HierarchyNode, StructureStats};
