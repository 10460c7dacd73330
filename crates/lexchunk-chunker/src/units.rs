use lexchunk_core::types::{slugify, HierarchyKind, PathEntry};
use lexchunk_structure::HierarchyNode;

/// Smallest piece of text the packer places: one node's heading and body,
/// or a whole Point.
#[derive(Debug, Clone)]
pub(crate) struct Unit {
    pub text: String,
    pub path: Vec<PathEntry>,
    /// `doc/chuong-i/dieu-5`, used as `parent_id` when the unit is split.
    pub key: String,
    /// Points are never split.
    pub atomic: bool,
    /// Size of the Article or Clause subtree this unit opens.
    pub group_chars: Option<usize>,
}

/// Units in document order.
pub(crate) fn flatten(tree: &HierarchyNode, doc_id: &str) -> Vec<Unit> {
    let mut units = Vec::new();
    let mut path = Vec::new();
    visit(tree, doc_id, &mut path, &mut units);
    units
}

fn visit(node: &HierarchyNode, parent_key: &str, path: &mut Vec<PathEntry>, out: &mut Vec<Unit>) {
    let entry = node.path_entry();
    let key = match &entry {
        Some(e) => format!("{}/{}-{}", parent_key, e.kind.slug(), slugify(&e.number)),
        None => parent_key.to_string(),
    };
    let pushed = entry.map(|e| path.push(e)).is_some();

    if node.kind == HierarchyKind::Point {
        let text = node.full_text();
        if !text.trim().is_empty() {
            out.push(Unit { text, path: path.clone(), key, atomic: true, group_chars: None });
        }
    } else {
        let text = node.own_text();
        if !text.trim().is_empty() {
            let group_chars = matches!(node.kind, HierarchyKind::Article | HierarchyKind::Clause)
                .then(|| node.full_text().chars().count());
            out.push(Unit { text, path: path.clone(), key: key.clone(), atomic: false, group_chars });
        }
        for child in &node.children {
            visit(child, &key, path, out);
        }
    }

    if pushed {
        path.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexchunk_core::types::DocType;
    use lexchunk_structure::parse;

    #[test]
    fn units_follow_document_order_with_paths() {
        let tree = parse("Lời nói đầu.\nChương I\nĐiều 1. A\n1. Khoản.\na) Điểm.\nb) Điểm hai.", DocType::Decree);
        let units = flatten(&tree, "nd-15");
        let keys: Vec<_> = units.iter().map(|u| u.key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "nd-15",
                "nd-15/chuong-i",
                "nd-15/chuong-i/dieu-1",
                "nd-15/chuong-i/dieu-1/khoan-1",
                "nd-15/chuong-i/dieu-1/khoan-1/diem-a",
                "nd-15/chuong-i/dieu-1/khoan-1/diem-b",
            ]
        );
        assert!(units[0].path.is_empty());
        assert_eq!(units[4].path.len(), 4);
        assert!(units[4].atomic && !units[3].atomic);
        assert_eq!(units[2].group_chars, Some("Điều 1. A\n1. Khoản.\na) Điểm.\nb) Điểm hai.".chars().count()));
        assert_eq!(units[1].group_chars, None);
    }
}
