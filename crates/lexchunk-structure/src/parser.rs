use tracing::debug;

use lexchunk_core::types::{DocType, HierarchyKind};

use crate::detector::{Heading, StructureDetector};
use crate::tree::HierarchyNode;

const LEVELS: usize = HierarchyKind::Point as usize + 1;

/// Node under construction. Children are arena indices.
struct Slot {
    kind: HierarchyKind,
    number: String,
    title: String,
    heading: String,
    content: String,
    start: usize,
    end: usize,
    children: Vec<usize>,
}

impl Slot {
    fn new(heading: Heading, line: &str, start: usize, end: usize) -> Self {
        Self {
            kind: heading.kind,
            number: heading.number,
            title: heading.title,
            heading: line.to_string(),
            content: String::new(),
            start,
            end,
            children: Vec::new(),
        }
    }
}

/// Open node per depth plus the content lines not yet attached.
struct ParseState<'a> {
    open: [Option<usize>; LEVELS],
    pending: Vec<&'a str>,
}

impl<'a> ParseState<'a> {
    fn new() -> Self {
        let mut open = [None; LEVELS];
        open[HierarchyKind::Document.depth()] = Some(0);
        Self { open, pending: Vec::new() }
    }

    fn is_open(&self, kind: HierarchyKind) -> bool {
        self.open[kind.depth()].is_some()
    }

    fn deepest_open(&self) -> usize {
        self.open.iter().rev().flatten().next().copied().unwrap_or(0)
    }

    /// Nearest open node strictly shallower than `kind`.
    fn parent_for(&self, kind: HierarchyKind) -> usize {
        self.open[..kind.depth()].iter().rev().flatten().next().copied().unwrap_or(0)
    }

    /// Attach buffered lines to the deepest open node. Leading and trailing
    /// blank lines are dropped; inner blank lines stay as paragraph breaks.
    fn flush(&mut self, arena: &mut [Slot]) {
        let lines = std::mem::take(&mut self.pending);
        let first = lines.iter().position(|l| !l.is_empty());
        let last = lines.iter().rposition(|l| !l.is_empty());
        let (Some(first), Some(last)) = (first, last) else { return };
        let text = lines[first..=last].join("\n");
        let target = &mut arena[self.deepest_open()];
        if !target.content.is_empty() {
            target.content.push('\n');
        }
        target.content.push_str(&text);
    }

    /// Close every node at `kind`'s depth or deeper; their extent ends at `at`.
    fn close_from(&mut self, kind: HierarchyKind, at: usize, arena: &mut [Slot]) {
        for slot in &mut self.open[kind.depth()..] {
            if let Some(idx) = slot.take() {
                arena[idx].end = at;
            }
        }
    }
}

/// Builds a [`HierarchyNode`] tree from raw document text. Never fails:
/// malformed input yields a best-effort tree.
pub struct StructureParser {
    detector: StructureDetector,
}

impl StructureParser {
    pub fn new(doc_type: DocType) -> Self {
        Self { detector: StructureDetector::new(doc_type) }
    }

    pub fn doc_type(&self) -> DocType { self.detector.doc_type() }

    pub fn parse(&self, text: &str) -> HierarchyNode {
        let root = Slot::new(
            Heading { kind: HierarchyKind::Document, number: String::new(), title: String::new() },
            "",
            0,
            text.len(),
        );
        let mut arena = vec![root];
        let mut state = ParseState::new();

        let mut offset = 0;
        for raw in text.split_inclusive('\n') {
            let start = offset;
            offset += raw.len();
            let line = raw.trim();
            if line.is_empty() {
                state.pending.push("");
                continue;
            }
            match self.detector.detect(line) {
                Some(heading) if accepts(&state, heading.kind) => {
                    state.flush(&mut arena);
                    state.close_from(heading.kind, start, &mut arena);
                    let parent = state.parent_for(heading.kind);
                    let depth = heading.kind.depth();
                    let idx = arena.len();
                    arena.push(Slot::new(heading, line, start, text.len()));
                    arena[parent].children.push(idx);
                    state.open[depth] = Some(idx);
                }
                _ => state.pending.push(line),
            }
        }
        state.flush(&mut arena);

        debug!(doc_type = %self.doc_type(), nodes = arena.len() - 1, "parsed document structure");
        build(&mut arena, 0)
    }
}

/// Clauses need an open Article; Points need an open Clause or Article.
fn accepts(state: &ParseState<'_>, kind: HierarchyKind) -> bool {
    match kind {
        HierarchyKind::Clause => state.is_open(HierarchyKind::Article),
        HierarchyKind::Point => state.is_open(HierarchyKind::Clause) || state.is_open(HierarchyKind::Article),
        _ => true,
    }
}

fn build(arena: &mut [Slot], idx: usize) -> HierarchyNode {
    let child_ids = std::mem::take(&mut arena[idx].children);
    let children = child_ids.into_iter().map(|c| build(arena, c)).collect();
    let slot = &mut arena[idx];
    HierarchyNode {
        kind: slot.kind,
        number: std::mem::take(&mut slot.number),
        title: std::mem::take(&mut slot.title),
        heading: std::mem::take(&mut slot.heading),
        content: std::mem::take(&mut slot.content),
        span: slot.start..slot.end,
        children,
    }
}

/// Parse with a throwaway parser.
pub fn parse(text: &str, doc_type: DocType) -> HierarchyNode {
    StructureParser::new(doc_type).parse(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use HierarchyKind::*;

    fn kinds(node: &HierarchyNode) -> Vec<(HierarchyKind, String)> {
        node.children.iter().map(|c| (c.kind, c.number.clone())).collect()
    }

    #[test]
    fn article_clause_point_nesting() {
        let root = parse("Điều 1. Phạm vi.\n\n1. Nội dung một.\n\na) Điểm a.", DocType::Decree);
        assert_eq!(kinds(&root), vec![(Article, "1".to_string())]);
        let article = &root.children[0];
        assert_eq!(article.title, "Phạm vi.");
        assert_eq!(kinds(article), vec![(Clause, "1".to_string())]);
        let clause = &article.children[0];
        assert_eq!(kinds(clause), vec![(Point, "a".to_string())]);
        assert!(clause.children[0].is_leaf());
        assert!(root.validate_structure());
    }

    #[test]
    fn headings_close_deeper_levels() {
        let text = "Chương I\nQUY ĐỊNH CHUNG\nĐiều 1. Phạm vi\nNội dung điều 1.\n1. Khoản một.\nĐiều 2. Đối tượng\nNội dung điều 2.\nChương II\nĐiều 3. Hiệu lực\n";
        let root = parse(text, DocType::Decree);
        assert_eq!(kinds(&root), vec![(Chapter, "I".to_string()), (Chapter, "II".to_string())]);
        let ch1 = &root.children[0];
        assert_eq!(ch1.content, "QUY ĐỊNH CHUNG");
        assert_eq!(kinds(ch1), vec![(Article, "1".to_string()), (Article, "2".to_string())]);
        assert_eq!(ch1.children[0].content, "Nội dung điều 1.");
        assert_eq!(ch1.children[0].children[0].heading, "1. Khoản một.");
        assert_eq!(ch1.children[1].content, "Nội dung điều 2.");
        assert_eq!(kinds(&root.children[1]), vec![(Article, "3".to_string())]);
    }

    #[test]
    fn spans_cover_heading_to_next_sibling() {
        let text = "Điều 1. A\nmột\nĐiều 2. B\nhai\n";
        let root = parse(text, DocType::Law);
        let a1 = &root.children[0];
        let a2 = &root.children[1];
        assert_eq!(&text[a1.span.clone()], "Điều 1. A\nmột\n");
        assert_eq!(&text[a2.span.clone()], "Điều 2. B\nhai\n");
        assert_eq!(root.span, 0..text.len());
    }

    #[test]
    fn numbered_preamble_stays_content() {
        let text = "Căn cứ:\n1. Luật Đấu thầu;\n2. Nghị định 63;\nĐiều 1. Ban hành\n1. Khoản một.";
        let root = parse(text, DocType::Decision);
        assert_eq!(root.content, "Căn cứ:\n1. Luật Đấu thầu;\n2. Nghị định 63;");
        assert_eq!(kinds(&root), vec![(Article, "1".to_string())]);
        assert_eq!(root.children[0].children.len(), 1);
    }

    #[test]
    fn points_attach_to_article_without_clause() {
        let root = parse("Điều 2. Giải thích\na) Một;\nb) Hai.", DocType::Decree);
        assert_eq!(kinds(&root.children[0]), vec![(Point, "a".to_string()), (Point, "b".to_string())]);
    }

    #[test]
    fn paragraph_breaks_survive_in_content() {
        let root = parse("Điều 1. A\n\nĐoạn một.\n\n\nĐoạn hai.\n\n", DocType::Law);
        assert_eq!(root.children[0].content, "Đoạn một.\n\n\nĐoạn hai.");
    }

    #[test]
    fn empty_and_headless_input() {
        let root = parse("", DocType::Decree);
        assert!(root.children.is_empty());
        assert!(!root.validate_structure());

        let root = parse("Văn bản không có cấu trúc.\nDòng thứ hai.", DocType::Other);
        assert!(root.children.is_empty());
        assert_eq!(root.content, "Văn bản không có cấu trúc.\nDòng thứ hai.");
        assert!(!root.validate_structure());
    }
}
