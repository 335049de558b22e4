//! Assertions over assembled documents

use lopdf::Document;
use std::path::Path;

/// Width of every page's MediaBox, in page order
pub fn page_widths(path: &Path) -> Vec<i64> {
    let doc = Document::load(path).unwrap();
    doc.get_pages()
        .values()
        .map(|&id| {
            let page = doc.get_object(id).unwrap().as_dict().unwrap();
            page.get(b"MediaBox").unwrap().as_array().unwrap()[2]
                .as_i64()
                .unwrap()
        })
        .collect()
}

/// Assert that `path` is a PDF whose pages are the fixture pages `positions`,
/// in that order
pub fn assert_pages_in_order(path: &Path, positions: &[u32]) {
    let expected: Vec<i64> = positions.iter().map(|&p| 10 + i64::from(p)).collect();
    assert_eq!(
        page_widths(path),
        expected,
        "document {} has pages out of order",
        path.display()
    );
}
