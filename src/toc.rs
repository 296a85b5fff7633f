use crate::html::{self, attribute, heading_level};
use crate::renderer::markdown_to_html;
use crate::slug::heading_id;
use markup5ever_rcdom::NodeData;
use serde::Serialize;

/// One heading in a post outline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocItem {
    pub level: u8,
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TocItem>,
}

impl TocItem {
    fn new(level: u8, id: String, title: String) -> Self {
        Self {
            level,
            id,
            title,
            children: Vec::new(),
        }
    }
}

/// Outline of markdown (or raw HTML) post content.
pub fn build_toc(content: &str) -> Vec<TocItem> {
    if content.trim().is_empty() {
        return Vec::new();
    }
    toc_from_html(&markdown_to_html(content))
}

/// Outline of already-rendered HTML, headings in document order.
pub fn toc_from_html(html: &str) -> Vec<TocItem> {
    let root = html::parse(html);
    let mut flat = Vec::new();

    html::walk(&root, |node| {
        let NodeData::Element { name, attrs, .. } = &node.data else {
            return false;
        };
        let Some(level) = html::html_element_name(node).and_then(heading_level) else {
            return true;
        };

        let title = html::text_content(node);
        if title.is_empty() {
            return false;
        }

        let id = match attribute(&attrs.borrow(), "id") {
            Some(id) if !id.trim().is_empty() => id.to_string(),
            _ => heading_id(&title),
        };
        tracing::trace!(tag = %name.local, %id, "toc heading");

        flat.push(TocItem::new(level, id, title));
        false
    });

    nest(flat)
}

/// Nest a flat heading list: each item becomes a child of the nearest
/// preceding open item with a smaller level.
fn nest(flat: Vec<TocItem>) -> Vec<TocItem> {
    let mut roots: Vec<TocItem> = Vec::new();
    let mut open: Vec<TocItem> = Vec::new();

    for item in flat {
        while open.last().is_some_and(|top| top.level >= item.level) {
            close_top(&mut open, &mut roots);
        }
        open.push(item);
    }
    while !open.is_empty() {
        close_top(&mut open, &mut roots);
    }

    roots
}

fn close_top(open: &mut Vec<TocItem>, roots: &mut Vec<TocItem>) {
    let Some(done) = open.pop() else {
        return;
    };
    match open.last_mut() {
        Some(parent) => parent.children.push(done),
        None => roots.push(done),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn item(level: u8, id: &str, title: &str, children: Vec<TocItem>) -> TocItem {
        TocItem {
            level,
            id: id.to_string(),
            title: title.to_string(),
            children,
        }
    }

    #[test]
    fn test_nested_outline() {
        let toc = build_toc("# Title\n## Sub\n### Deep\n## Sub2");
        assert_eq!(
            toc,
            vec![item(
                1,
                "title",
                "Title",
                vec![
                    item(2, "sub", "Sub", vec![item(3, "deep", "Deep", vec![])]),
                    item(2, "sub2", "Sub2", vec![]),
                ],
            )]
        );
    }

    #[test]
    fn test_levels_not_fabricated() {
        // An h3 directly below an h1 is its child; no synthetic h2 appears
        let toc = build_toc("# A\n### B\n## C");
        assert_eq!(toc.len(), 1);
        assert_eq!(toc[0].children.len(), 2);
        assert_eq!(toc[0].children[0].level, 3);
        assert_eq!(toc[0].children[1].level, 2);
    }

    #[test]
    fn test_leading_deep_heading_is_root() {
        let toc = build_toc("### Late\n# Top\n## Sub");
        assert_eq!(toc.len(), 2);
        assert_eq!(toc[0].title, "Late");
        assert_eq!(toc[1].children[0].title, "Sub");
    }

    #[test]
    fn test_inline_markup_stripped_from_titles() {
        let toc = build_toc("## Using `serde` with **care**");
        assert_eq!(toc[0].title, "Using serde with care");
        assert_eq!(toc[0].id, "using-serde-with-care");
    }

    #[test]
    fn test_raw_html_headings_and_existing_ids() {
        let toc = toc_from_html(r#"<h2 id="custom">Custom</h2><div><h3>Inner</h3></div>"#);
        assert_eq!(toc[0].id, "custom");
        assert_eq!(toc[0].children[0].id, "inner");
    }

    #[test]
    fn test_blank_id_matches_sanitized_anchor() {
        let raw = r#"<h2 id="">Setup</h2><h2 id=" ">Usage</h2>"#;
        let clean = crate::sanitizer::Sanitizer::default().sanitize(raw);

        let ids: Vec<_> = toc_from_html(raw).into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["setup", "usage"]);
        for id in &ids {
            assert!(clean.contains(&format!(r#"id="{}""#, id)), "{}", clean);
        }
    }

    #[test]
    fn test_empty_headings_skipped() {
        let toc = toc_from_html("<h1></h1><h2>Real</h2><h3>  </h3>");
        assert_eq!(toc, vec![item(2, "real", "Real", vec![])]);
    }

    #[test]
    fn test_empty_content() {
        assert!(build_toc("").is_empty());
        assert!(build_toc("just a paragraph").is_empty());
    }

    #[test]
    fn test_ids_stable_across_calls() {
        let content = "# Hello World\n## Again";
        assert_eq!(build_toc(content), build_toc(content));
    }

    #[test]
    fn test_serialized_shape() {
        let toc = build_toc("# A");
        let json = serde_json::to_value(&toc).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{"level": 1, "id": "a", "title": "A"}])
        );
    }
}
