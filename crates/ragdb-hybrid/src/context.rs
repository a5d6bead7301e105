//! Context assembly: turns ranked results into citation-formatted strings
//! for downstream prompt construction.

use ragdb_core::types::{ChunkId, RankedResult};

/// Format the top `top_k` results as `"{content}\n[Source: {name}{, Page N}]"`
/// and return the formatted strings with the parallel chunk-id list used for
/// citation tracking. Source name precedence: filename, original name,
/// `"unknown"`. No score filtering happens here.
pub fn assemble(results: &[RankedResult], top_k: usize) -> (Vec<String>, Vec<ChunkId>) {
    let mut texts = Vec::with_capacity(top_k.min(results.len()));
    let mut ids = Vec::with_capacity(top_k.min(results.len()));

    for result in results.iter().take(top_k) {
        let source = if !result.filename.is_empty() {
            result.filename.as_str()
        } else {
            result
                .original_name
                .as_deref()
                .filter(|n| !n.is_empty())
                .unwrap_or("unknown")
        };

        let mut attribution = format!("[Source: {source}");
        if let Some(page) = result.page_number {
            attribution.push_str(&format!(", Page {page}"));
        }
        attribution.push(']');

        texts.push(format!("{}\n{}", result.content, attribution));
        ids.push(result.id.clone());
    }

    (texts, ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragdb_core::types::ResultSource;

    fn result(id: &str, filename: &str, original: Option<&str>, page: Option<u32>) -> RankedResult {
        RankedResult {
            id: id.to_string(),
            content: format!("body {id}"),
            score: 1.0,
            source: ResultSource::Lexical,
            chunk_index: 0,
            page_number: page,
            document_id: "doc".to_string(),
            filename: filename.to_string(),
            original_name: original.map(str::to_string),
        }
    }

    #[test]
    fn formats_with_filename_and_page() {
        let (texts, ids) = assemble(&[result("c1", "net.pdf", None, Some(3))], 5);
        assert_eq!(texts, vec!["body c1\n[Source: net.pdf, Page 3]".to_string()]);
        assert_eq!(ids, vec!["c1".to_string()]);
    }

    #[test]
    fn omits_page_when_absent() {
        let (texts, _) = assemble(&[result("c1", "net.pdf", None, None)], 5);
        assert_eq!(texts[0], "body c1\n[Source: net.pdf]");
    }

    #[test]
    fn falls_back_to_original_name_then_unknown() {
        let (texts, _) = assemble(
            &[
                result("c1", "", Some("upload.docx"), None),
                result("c2", "", None, None),
            ],
            5,
        );
        assert!(texts[0].ends_with("[Source: upload.docx]"));
        assert!(texts[1].ends_with("[Source: unknown]"));
    }

    #[test]
    fn truncates_to_top_k_with_parallel_ids() {
        let results = vec![
            result("c1", "a.txt", None, None),
            result("c2", "b.txt", None, None),
            result("c3", "c.txt", None, None),
        ];
        let (texts, ids) = assemble(&results, 2);
        assert_eq!(texts.len(), 2);
        assert_eq!(ids, vec!["c1".to_string(), "c2".to_string()]);
    }

    #[test]
    fn empty_results_assemble_to_nothing() {
        let (texts, ids) = assemble(&[], 5);
        assert!(texts.is_empty());
        assert!(ids.is_empty());
    }
}
