//! Multi-document YAML stream splitting
//!
//! A rendered chart is one text blob holding many documents separated by
//! `---` lines. Splitting is purely textual: document content is never
//! parsed here, that is the classifier's job.

use crate::error::Result;

const UTF8_BOM: char = '\u{feff}';

/// One document from a manifest stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Position among the non-empty documents of the stream
    pub seq: usize,
    /// Raw document text
    pub text: String,
}

enum Line<'a> {
    Content(&'a str),
    /// Document boundary, possibly carrying content that starts the next document
    Boundary(Option<&'a str>),
}

fn classify_line(line: &str) -> Line<'_> {
    if line.trim_end() == "..." {
        return Line::Boundary(None);
    }

    let Some(rest) = line.strip_prefix("---") else {
        return Line::Content(line);
    };

    if rest.is_empty() {
        return Line::Boundary(None);
    }

    // `----` or `---foo` is content, not a marker
    if !rest.starts_with([' ', '\t']) {
        return Line::Content(line);
    }

    let rest = rest.trim();
    if rest.is_empty() || rest.starts_with('#') {
        Line::Boundary(None)
    } else {
        Line::Boundary(Some(rest))
    }
}

fn flush(current: &mut String, docs: &mut Vec<Document>) {
    if !current.trim().is_empty() {
        docs.push(Document {
            seq: docs.len(),
            text: std::mem::take(current),
        });
    } else {
        current.clear();
    }
}

/// Split a manifest into its non-empty documents, in stream order
pub fn split_documents(manifest: &str) -> Vec<Document> {
    let mut docs = Vec::new();
    let mut current = String::new();

    for line in manifest.lines() {
        match classify_line(line) {
            Line::Content(content) => {
                current.push_str(content);
                current.push('\n');
            }
            Line::Boundary(carry) => {
                flush(&mut current, &mut docs);
                if let Some(carry) = carry {
                    current.push_str(carry);
                    current.push('\n');
                }
            }
        }
    }
    flush(&mut current, &mut docs);

    docs
}

/// Split a raw byte stream, failing only when it is not UTF-8
pub fn split_bytes(bytes: &[u8]) -> Result<Vec<Document>> {
    let text = std::str::from_utf8(bytes)?;
    Ok(split_documents(text.trim_start_matches(UTF8_BOM)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ManifestError;

    fn texts(docs: &[Document]) -> Vec<&str> {
        docs.iter().map(|d| d.text.trim()).collect()
    }

    #[test]
    fn test_split_basic() {
        let manifest = "kind: A\n---\nkind: B\n---\nkind: C\n";
        let docs = split_documents(manifest);

        assert_eq!(texts(&docs), vec!["kind: A", "kind: B", "kind: C"]);
        assert_eq!(
            docs.iter().map(|d| d.seq).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_split_drops_blank_fragments() {
        let manifest = "---\n\n---\n   \n---\nkind: A\n---\n---\n";
        let docs = split_documents(manifest);

        assert_eq!(texts(&docs), vec!["kind: A"]);
        assert_eq!(docs[0].seq, 0);
    }

    #[test]
    fn test_split_empty_input() {
        assert!(split_documents("").is_empty());
        assert!(split_documents("\n\n  \n").is_empty());
    }

    #[test]
    fn test_marker_with_comment_and_source_header() {
        let manifest = r#"--- # Source: bigbang/templates/istio/helmrelease.yaml
kind: HelmRelease
---
# Source: bigbang/templates/istio/gitrepository.yaml
kind: GitRepository
"#;
        let docs = split_documents(manifest);

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].text.trim(), "kind: HelmRelease");
        assert!(docs[1].text.contains("kind: GitRepository"));
    }

    #[test]
    fn test_dashes_inside_content_are_not_markers() {
        let manifest = "kind: ConfigMap\ndata:\n  values.yaml: |\n    banner: ---- hi\n    rule: \"---\"\n---\nkind: Secret\n";
        let docs = split_documents(manifest);

        assert_eq!(docs.len(), 2);
        assert!(docs[0].text.contains("---- hi"));
        assert!(docs[0].text.contains("\"---\""));
    }

    #[test]
    fn test_inline_content_after_marker() {
        let docs = split_documents("--- kind: A\n--- \nkind: B\n");
        assert_eq!(texts(&docs), vec!["kind: A", "kind: B"]);
    }

    #[test]
    fn test_document_end_marker() {
        let docs = split_documents("kind: A\n...\nkind: B\n");
        assert_eq!(texts(&docs), vec!["kind: A", "kind: B"]);
    }

    #[test]
    fn test_crlf_line_endings() {
        let docs = split_documents("kind: A\r\n---\r\nkind: B\r\n");
        assert_eq!(texts(&docs), vec!["kind: A", "kind: B"]);
    }

    #[test]
    fn test_split_bytes_strips_bom() {
        let bytes = "\u{feff}kind: A\n---\nkind: B\n".as_bytes();
        let docs = split_bytes(bytes).unwrap();
        assert_eq!(texts(&docs), vec!["kind: A", "kind: B"]);
    }

    #[test]
    fn test_split_bytes_rejects_invalid_utf8() {
        let bytes = b"kind: A\n---\nkind: \xff\xfe\n";
        let err = split_bytes(bytes).unwrap_err();
        assert!(matches!(err, ManifestError::InvalidEncoding { offset: 18 }));
    }
}
