//! Thin helpers over the html5ever parse tree shared by the sanitizer,
//! analyzer and table-of-contents builder.

use html5ever::tendril::TendrilSink;
use html5ever::{local_name, namespace_url, ns, parse_fragment, Attribute, ParseOpts, QualName};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

/// Elements whose content is never visible text.
const INVISIBLE: &[&str] = &[
    "script", "style", "template", "noscript", "textarea", "title", "iframe", "object",
    "embed", "select",
];

/// Parse an HTML fragment as if it were the content of `<body>`.
///
/// Returns the synthetic root element holding the fragment's nodes.
pub fn parse(html: &str) -> Handle {
    let dom = parse_fragment(
        RcDom::default(),
        ParseOpts::default(),
        QualName::new(None, ns!(html), local_name!("body")),
        Vec::new(),
    )
    .one(html);

    // Detach before `dom` drops: RcDom's drop empties every attached node.
    let root = dom.document.children.borrow_mut().pop();
    root.unwrap_or_else(|| dom.document.clone())
}

/// Local name of an HTML-namespace element, `None` for anything else.
pub fn html_element_name(node: &Handle) -> Option<&str> {
    match &node.data {
        NodeData::Element { name, .. } if name.ns == ns!(html) => Some(&*name.local),
        _ => None,
    }
}

/// Heading level (1-6) of an `h1`..`h6` element.
pub fn heading_level(tag: &str) -> Option<u8> {
    match tag {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

pub fn attribute<'a>(attrs: &'a [Attribute], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|attr| &*attr.name.local == name)
        .map(|attr| &*attr.value)
}

/// Depth-first, document-order walk over every node below `root`.
///
/// `visit` returns whether to descend into the node's children.
pub fn walk<F>(root: &Handle, mut visit: F)
where
    F: FnMut(&Handle) -> bool,
{
    let mut stack: Vec<Handle> = root.children.borrow().iter().rev().cloned().collect();

    while let Some(node) = stack.pop() {
        if visit(&node) {
            stack.extend(node.children.borrow().iter().rev().cloned());
        }
    }
}

/// Append the visible text below `root`. Every element start counts as a
/// word boundary so adjacent blocks do not run their words together.
pub fn push_text(root: &Handle, out: &mut String) {
    walk(root, |node| match &node.data {
        NodeData::Text { contents } => {
            out.push_str(&contents.borrow());
            false
        }
        NodeData::Element { name, .. } => {
            if name.ns != ns!(html) || INVISIBLE.contains(&&*name.local) {
                return false;
            }
            out.push(' ');
            true
        }
        _ => false,
    });
}

/// Visible text of `node` with whitespace runs collapsed to single spaces.
pub fn text_content(node: &Handle) -> String {
    let mut raw = String::new();
    push_text(node, &mut raw);
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
