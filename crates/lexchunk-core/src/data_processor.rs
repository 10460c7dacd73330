//! Directory source: turns a tree of extracted `.txt` files into
//! [`DocumentInput`]s with best-effort metadata (type, number, title, date).

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::Result;
use crate::types::{slugify, DocType, DocumentInput, SourceMetadata};

const NUMBER: &str = r"\d{1,4}(?:/\d{4})?/[A-ZĐ][A-ZĐ0-9]*(?:-[A-ZĐ0-9]+)*";

static DOC_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"\b({NUMBER})")).expect("document number pattern"));

/// The `Số: ...` line of the header block.
static HEADER_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"(?m)^\s*Số\s*:?\s*({NUMBER})")).expect("header number pattern"));

static ISSUE_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)ngày\s+(\d{1,2})\s+tháng\s+(\d{1,2})\s+năm\s+(\d{4})").expect("issue date pattern")
});

#[derive(Default)]
pub struct DataProcessor {
    doc_type: Option<DocType>,
}

impl DataProcessor {
    pub fn new() -> Self { Self::default() }

    /// Force a document type instead of guessing it per file.
    pub fn with_doc_type(mut self, doc_type: DocType) -> Self {
        self.doc_type = Some(doc_type);
        self
    }

    pub fn process_directory(&self, data_dir: &Path) -> Result<Vec<DocumentInput>> {
        self.process_files(data_dir, self.list_txt_files(data_dir))
    }

    pub fn process_directory_limited(&self, data_dir: &Path, limit: usize) -> Result<Vec<DocumentInput>> {
        let mut files = self.list_txt_files(data_dir);
        if files.len() > limit {
            files.truncate(limit);
            info!(limit, "limited to first files");
        }
        self.process_files(data_dir, files)
    }

    fn process_files(&self, data_dir: &Path, files: Vec<PathBuf>) -> Result<Vec<DocumentInput>> {
        if files.is_empty() {
            info!(dir = %data_dir.display(), "no .txt files found");
            return Ok(vec![]);
        }
        let mut documents = Vec::with_capacity(files.len());
        for (file_index, file_path) in files.iter().enumerate() {
            debug!(file = %file_path.display(), n = file_index + 1, total = files.len(), "loading document");
            documents.push(self.load_file(file_path, data_dir)?);
        }
        info!(documents = documents.len(), dir = %data_dir.display(), "loaded documents");
        Ok(documents)
    }

    /// Read one file and derive its metadata. `data_dir` anchors the category facet.
    pub fn load_file(&self, file_path: &Path, data_dir: &Path) -> Result<DocumentInput> {
        let content = self.read_file_content(file_path)?;
        let file_name = file_path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
        let doc_type = self.doc_type.unwrap_or_else(|| DocType::guess(&file_name, &content));

        let mut metadata = SourceMetadata::new(file_path.to_string_lossy(), doc_type);
        metadata.document_id = self.extract_doc_id(file_path);
        metadata.document_number = extract_document_number(&content);
        metadata.title = extract_title(&content, doc_type);
        metadata.issue_date = extract_issue_date(&content);
        metadata.extra.insert("category".to_string(), self.get_facet_from_path(file_path, data_dir));
        Ok(DocumentInput::new(content, metadata))
    }

    fn read_file_content(&self, file_path: &Path) -> Result<String> {
        match fs::read_to_string(file_path) {
            Ok(content) => Ok(content),
            Err(_) => Ok(String::from_utf8_lossy(&fs::read(file_path)?).to_string()),
        }
    }

    fn extract_doc_id(&self, file_path: &Path) -> String {
        slugify(&file_path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default())
    }

    fn get_facet_from_path(&self, file_path: &Path, data_dir: &Path) -> String {
        let relative_path = file_path.strip_prefix(data_dir).unwrap_or(file_path);
        if let Some(parent) = relative_path.parent() {
            if let Some(facet) = parent.to_str() {
                if !facet.is_empty() { return facet.to_string(); }
            }
        }
        "misc".to_string()
    }

    fn list_txt_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut txt_files = Vec::new();
        for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("txt") { txt_files.push(path.to_path_buf()); }
        }
        txt_files.sort();
        txt_files
    }
}

/// Official number from the `Số:` header line, e.g. `15/2023/TT-BTC` or
/// `1234/QĐ-BKHĐT`. Without a header line, the first number in the text.
pub fn extract_document_number(text: &str) -> Option<String> {
    HEADER_NUMBER
        .captures(text)
        .or_else(|| DOC_NUMBER.captures(text))
        .map(|c| c[1].to_string())
}

/// The line following the document-type title line (`THÔNG TƯ` / `Hướng dẫn ...`).
pub fn extract_title(text: &str, doc_type: DocType) -> Option<String> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty()).take(40);
    while let Some(line) = lines.next() {
        if line.starts_with(doc_type.label()) {
            let rest = line[doc_type.label().len()..].trim();
            if !rest.is_empty() {
                return Some(rest.to_string());
            }
            return lines.next().map(str::to_string);
        }
    }
    None
}

/// `..., ngày 15 tháng 3 năm 2023` -> 2023-03-15.
pub fn extract_issue_date(text: &str) -> Option<NaiveDate> {
    ISSUE_DATE.captures_iter(text).find_map(|c| {
        let day = c[1].parse().ok()?;
        let month = c[2].parse().ok()?;
        let year = c[3].parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "BỘ TÀI CHÍNH\nSố: 15/2023/TT-BTC\nHà Nội, ngày 15 tháng 3 năm 2023\nTHÔNG TƯ\nHướng dẫn quản lý ngân sách\n";

    #[test]
    fn extracts_number_date_and_title() {
        assert_eq!(extract_document_number(HEADER).as_deref(), Some("15/2023/TT-BTC"));
        assert_eq!(extract_issue_date(HEADER), NaiveDate::from_ymd_opt(2023, 3, 15));
        assert_eq!(extract_title(HEADER, DocType::Circular).as_deref(), Some("Hướng dẫn quản lý ngân sách"));
        assert_eq!(extract_title(HEADER, DocType::Decree), None);
    }

    #[test]
    fn decree_number_with_vietnamese_letter() {
        assert_eq!(extract_document_number("Số: 24/2024/NĐ-CP").as_deref(), Some("24/2024/NĐ-CP"));
    }

    #[test]
    fn header_number_wins_over_cited_instruments() {
        let text = "BỘ KẾ HOẠCH VÀ ĐẦU TƯ\nSố: 1234/QĐ-BKHĐT\nQUYẾT ĐỊNH\nVề việc ban hành mẫu hồ sơ mời thầu\n\
                    Căn cứ Nghị định số 63/2014/NĐ-CP ngày 26/6/2014 của Chính phủ;\n";
        assert_eq!(DocType::guess("qd-1234.txt", text), DocType::Decision);
        assert_eq!(extract_document_number(text).as_deref(), Some("1234/QĐ-BKHĐT"));
    }

    #[test]
    fn falls_back_to_first_number_without_header() {
        let text = "Căn cứ Luật Đấu thầu và Nghị định số 63/2014/NĐ-CP;\nThông tư 15/2023/TT-BTC";
        assert_eq!(extract_document_number(text).as_deref(), Some("63/2014/NĐ-CP"));
        assert_eq!(extract_document_number("ngày 26/6/2014"), None);
    }

    #[test]
    fn invalid_calendar_date_is_ignored() {
        assert_eq!(extract_issue_date("ngày 31 tháng 2 năm 2023"), None);
    }
}
