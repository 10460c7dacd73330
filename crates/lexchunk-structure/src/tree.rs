use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::Range;

use lexchunk_core::error::StructureError;
use lexchunk_core::types::{HierarchyKind, PathEntry};

/// One node of a parsed legal document. The root has kind `Document`, an
/// empty number and heading, and spans the whole input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HierarchyNode {
    pub kind: HierarchyKind,
    pub number: String,
    pub title: String,
    /// Heading line as it appeared in the input (trimmed).
    pub heading: String,
    /// Body text between the heading and the first child heading.
    pub content: String,
    /// Byte range in the input, heading included, up to the next heading
    /// at the same or a shallower level.
    pub span: Range<usize>,
    pub children: Vec<HierarchyNode>,
}

impl HierarchyNode {
    pub fn root(len: usize) -> Self {
        Self {
            kind: HierarchyKind::Document,
            number: String::new(),
            title: String::new(),
            heading: String::new(),
            content: String::new(),
            span: 0..len,
            children: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool { self.kind == HierarchyKind::Document }

    pub fn is_leaf(&self) -> bool { self.children.is_empty() }

    /// `None` for the root.
    pub fn path_entry(&self) -> Option<PathEntry> {
        (!self.is_root()).then(|| PathEntry::new(self.kind, self.number.clone()))
    }

    /// Heading and content of this node alone, newline-joined.
    pub fn own_text(&self) -> String {
        match (self.heading.is_empty(), self.content.is_empty()) {
            (true, _) => self.content.clone(),
            (false, true) => self.heading.clone(),
            (false, false) => format!("{}\n{}", self.heading, self.content),
        }
    }

    /// Text of the whole subtree in document order.
    pub fn full_text(&self) -> String {
        let mut parts = Vec::new();
        self.collect_text(&mut parts);
        parts.join("\n")
    }

    fn collect_text(&self, parts: &mut Vec<String>) {
        let own = self.own_text();
        if !own.is_empty() {
            parts.push(own);
        }
        for child in &self.children {
            child.collect_text(parts);
        }
    }

    /// Pre-order traversal, self first.
    pub fn iter(&self) -> impl Iterator<Item = &HierarchyNode> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }

    pub fn count(&self, kind: HierarchyKind) -> usize {
        self.iter().filter(|n| n.kind == kind).count()
    }

    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(HierarchyNode::depth).max().unwrap_or(0)
    }

    /// A tree is usable only if it contains at least one Article.
    pub fn validate_structure(&self) -> bool {
        self.structure_error().is_none()
    }

    pub fn structure_error(&self) -> Option<StructureError> {
        if self.is_root() && self.children.is_empty() && self.content.trim().is_empty() {
            Some(StructureError::EmptyDocument)
        } else if self.count(HierarchyKind::Article) == 0 {
            Some(StructureError::NoArticles)
        } else {
            None
        }
    }

    pub fn stats(&self) -> StructureStats {
        let mut counts = BTreeMap::new();
        for node in self.iter().filter(|n| !n.is_root()) {
            *counts.entry(node.kind).or_insert(0) += 1;
        }
        StructureStats { counts, max_depth: self.depth().saturating_sub(1) }
    }
}

/// Per-kind node counts, for logging.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StructureStats {
    pub counts: BTreeMap<HierarchyKind, usize>,
    /// Levels below the root.
    pub max_depth: usize,
}

impl StructureStats {
    pub fn get(&self, kind: HierarchyKind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }
}
