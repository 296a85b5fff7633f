//! HTML sanitization for post bodies and reader comments.
//!
//! Input is parsed into an html5ever tree, walked, and re-serialized from
//! scratch: only allow-listed elements and attributes are ever written, so
//! nothing the parser saw can leak through untouched.

use crate::config::FolioConfig;
use crate::html::{self, attribute, heading_level};
use crate::slug::heading_id;
use html5ever::{namespace_url, ns, Attribute};
use markup5ever_rcdom::{Handle, NodeData};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use url::Url;

const SAFE_LINK_SCHEMES: &[&str] = &["http", "https", "mailto", "tel"];
const EXTERNAL_REL: &str = "noopener noreferrer nofollow";
const IMAGE_PLACEHOLDER: &str = r#"<span class="invalid-image">Image removed for security</span>"#;

/// Removed together with everything inside them, in every mode.
const FORBIDDEN: &[&str] = &[
    "script", "style", "iframe", "object", "embed", "form", "input", "button", "textarea",
    "select", "option", "noscript", "template", "title", "frame", "frameset", "applet", "link",
    "meta", "base",
];

/// Parents whose text/element children the parser would foster out of a table.
const TABLE_STRUCTURE: &[&str] = &["table", "thead", "tbody", "tfoot", "tr"];

const VOID: &[&str] = &["br", "hr", "img"];

const MAX_PASSES: usize = 8;
const MAX_DEPTH: usize = 256;

const MAX_CONTENT_BYTES: usize = 100_000;
const MAX_NESTING: usize = 10;

static SUSPICIOUS_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)<script[^>]*>",
        r"(?i)javascript:",
        r"(?i)vbscript:",
        r"(?i)data:text/html",
        r"(?i)\bon\w+\s*=",
        r"(?i)<iframe[^>]*>",
        r"(?i)<object[^>]*>",
        r"(?i)<embed[^>]*>",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("suspicious pattern is valid"))
    .collect()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Author-written post bodies
    Content,
    /// Reader comments: inline formatting and links only
    UserInput,
}

impl Mode {
    /// Allowed attributes of an allowed tag, `None` when the tag is not allowed.
    fn attributes(self, tag: &str) -> Option<&'static [&'static str]> {
        match self {
            Mode::Content => content_attributes(tag),
            Mode::UserInput => user_attributes(tag),
        }
    }

    fn forbids(self, tag: &str) -> bool {
        FORBIDDEN.contains(&tag) || (self == Mode::UserInput && tag == "img")
    }
}

fn content_attributes(tag: &str) -> Option<&'static [&'static str]> {
    let attrs: &'static [&'static str] = match tag {
        "p" | "br" | "strong" | "b" | "em" | "i" | "u" | "s" | "mark" | "small" | "sub"
        | "sup" | "ul" | "ol" | "li" | "cite" | "thead" | "tbody" | "tfoot" | "tr" | "hr" => &[],
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => &["id"],
        "a" => &["href", "title", "target", "rel"],
        "img" => &["src", "alt", "title", "width", "height"],
        "code" | "pre" | "span" | "table" => &["class"],
        "blockquote" => &["cite"],
        "div" => &["class", "id"],
        "th" => &["scope", "colspan", "rowspan"],
        "td" => &["colspan", "rowspan"],
        _ => return None,
    };
    Some(attrs)
}

fn user_attributes(tag: &str) -> Option<&'static [&'static str]> {
    let attrs: &'static [&'static str] = match tag {
        "p" | "br" | "strong" | "b" | "em" | "i" | "u" | "code" => &[],
        "a" => &["href"],
        _ => return None,
    };
    Some(attrs)
}

/// Result of the pre-save content check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Sanitizer {
    base_url: Url,
    internal_domains: Vec<String>,
    allow_localhost_images: bool,
}

impl Sanitizer {
    pub fn new(base_url: Url, internal_domains: Vec<String>, allow_localhost_images: bool) -> Self {
        Self {
            base_url,
            internal_domains: internal_domains
                .into_iter()
                .map(|domain| domain.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|domain| !domain.is_empty())
                .collect(),
            allow_localhost_images,
        }
    }

    pub fn from_config(config: &FolioConfig) -> Self {
        Self::new(
            config.base_url(),
            config.security.internal_domains.clone(),
            config.security.allow_localhost_images,
        )
    }

    /// Sanitize an author-written post body.
    pub fn sanitize(&self, raw: &str) -> String {
        self.clean_until_stable(raw, Mode::Content)
    }

    /// Sanitize a reader comment with the reduced allow-list; images are removed.
    pub fn sanitize_user_input(&self, raw: &str) -> String {
        self.clean_until_stable(raw, Mode::UserInput)
    }

    /// Unwrapping elements can hand the parser a different tree on the next
    /// read, so passes repeat until the output reads back as itself.
    fn clean_until_stable(&self, raw: &str, mode: Mode) -> String {
        if raw.trim().is_empty() {
            return String::new();
        }

        let mut current = self.clean_once(raw, mode);
        for _ in 1..MAX_PASSES {
            let next = self.clean_once(&current, mode);
            if next == current {
                return current;
            }
            current = next;
        }

        tracing::warn!(passes = MAX_PASSES, "sanitizer output did not settle");
        current
    }

    fn clean_once(&self, raw: &str, mode: Mode) -> String {
        let root = html::parse(raw);
        let mut out = String::with_capacity(raw.len());
        self.clean_children(&root, None, mode, 0, &mut out);
        // Blank input short-circuits to "", so blank output has to match it
        if out.trim().is_empty() {
            out.clear();
        }
        out
    }

    fn clean_children(
        &self,
        node: &Handle,
        parent: Option<&str>,
        mode: Mode,
        depth: usize,
        out: &mut String,
    ) {
        for child in node.children.borrow().iter() {
            self.clean_node(child, parent, mode, depth, out);
        }
    }

    fn clean_node(
        &self,
        node: &Handle,
        parent: Option<&str>,
        mode: Mode,
        depth: usize,
        out: &mut String,
    ) {
        match &node.data {
            NodeData::Text { contents } => escape_text(&contents.borrow(), out),
            NodeData::Element { name, attrs, .. } => {
                // svg and math subtrees have their own script vectors
                if name.ns != ns!(html) {
                    return;
                }
                if depth >= MAX_DEPTH {
                    tracing::warn!(depth, "dropping deeply nested markup");
                    return;
                }

                let tag: &str = &name.local;
                if mode.forbids(tag) {
                    return;
                }

                let Some(allowed) = mode.attributes(tag) else {
                    if !parent.is_some_and(|p| TABLE_STRUCTURE.contains(&p)) {
                        self.clean_children(node, parent, mode, depth + 1, out);
                    }
                    return;
                };

                let attrs = attrs.borrow();
                match tag {
                    "a" => self.clean_link(node, &attrs, allowed, parent, mode, depth, out),
                    "img" => self.clean_image(&attrs, allowed, out),
                    _ if heading_level(tag).is_some() => {
                        let kept = self.keep_attributes(&attrs, allowed);
                        self.write_heading(node, tag, kept, mode, depth, out);
                    }
                    _ => {
                        let kept = self.keep_attributes(&attrs, allowed);
                        self.write_element(node, tag, &kept, mode, depth, out);
                    }
                }
            }
            _ => {}
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn clean_link(
        &self,
        node: &Handle,
        attrs: &[Attribute],
        allowed: &[&'static str],
        parent: Option<&str>,
        mode: Mode,
        depth: usize,
        out: &mut String,
    ) {
        let Some(href) = attribute(attrs, "href") else {
            let kept = self.keep_attributes(attrs, allowed);
            self.write_element(node, "a", &kept, mode, depth, out);
            return;
        };

        match self.resolve(href) {
            Some(url) if SAFE_LINK_SCHEMES.contains(&url.scheme()) => {
                let mut kept = self.keep_attributes(attrs, allowed);
                if self.is_external(&url) {
                    kept.retain(|(name, _)| *name != "target" && *name != "rel");
                    kept.push(("target", "_blank".to_string()));
                    kept.push(("rel", EXTERNAL_REL.to_string()));
                }
                self.write_element(node, "a", &kept, mode, depth, out);
            }
            _ => {
                tracing::debug!(href, "stripping unsafe link");
                self.clean_children(node, parent, mode, depth + 1, out);
            }
        }
    }

    fn clean_image(&self, attrs: &[Attribute], allowed: &[&'static str], out: &mut String) {
        let src = attribute(attrs, "src").and_then(|src| self.resolve(src));

        match src {
            Some(url) if self.image_allowed(&url) => {
                let mut kept = self.keep_attributes(attrs, allowed);
                kept.push(("loading", "lazy".to_string()));
                kept.push(("referrerpolicy", "no-referrer".to_string()));
                open_tag("img", &kept, out);
            }
            _ => {
                tracing::debug!(src = attribute(attrs, "src"), "replacing unsafe image");
                out.push_str(IMAGE_PLACEHOLDER);
            }
        }
    }

    /// Allowed attributes in allow-list order, URL attributes checked.
    fn keep_attributes(
        &self,
        attrs: &[Attribute],
        allowed: &[&'static str],
    ) -> Vec<(&'static str, String)> {
        allowed
            .iter()
            .filter_map(|name| {
                let value = attribute(attrs, name)?;
                if *name == "id" && value.trim().is_empty() {
                    return None;
                }
                if *name == "cite" {
                    let url = self.resolve(value)?;
                    if !SAFE_LINK_SCHEMES.contains(&url.scheme()) {
                        return None;
                    }
                }
                Some((*name, value.to_string()))
            })
            .collect()
    }

    fn write_element(
        &self,
        node: &Handle,
        tag: &str,
        attrs: &[(&'static str, String)],
        mode: Mode,
        depth: usize,
        out: &mut String,
    ) {
        open_tag(tag, attrs, out);
        if VOID.contains(&tag) {
            return;
        }

        // The parser eats one newline directly after <pre>
        if tag == "pre" && starts_with_newline(node) {
            out.push('\n');
        }

        self.clean_children(node, Some(tag), mode, depth + 1, out);

        out.push_str("</");
        out.push_str(tag);
        out.push('>');
    }

    /// Headings without an id get one slugged from the text that survives cleaning.
    fn write_heading(
        &self,
        node: &Handle,
        tag: &str,
        mut attrs: Vec<(&'static str, String)>,
        mode: Mode,
        depth: usize,
        out: &mut String,
    ) {
        let mut inner = String::new();
        self.clean_children(node, Some(tag), mode, depth + 1, &mut inner);

        if !attrs.iter().any(|(name, _)| *name == "id") {
            let id = heading_id(&html::text_content(&html::parse(&inner)));
            if !id.is_empty() {
                attrs.push(("id", id));
            }
        }

        open_tag(tag, &attrs, out);
        out.push_str(&inner);
        out.push_str("</");
        out.push_str(tag);
        out.push('>');
    }

    fn resolve(&self, raw: &str) -> Option<Url> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        self.base_url.join(trimmed).ok()
    }

    fn is_external(&self, url: &Url) -> bool {
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }

        match url.host_str() {
            Some(host) => !self.is_internal_host(host),
            None => false,
        }
    }

    fn is_internal_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.internal_domains.iter().any(|domain| {
            host == *domain
                || host
                    .strip_suffix(domain.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }

    fn image_allowed(&self, url: &Url) -> bool {
        url.scheme() == "https"
            || (self.allow_localhost_images
                && matches!(url.scheme(), "http" | "https")
                && url.host_str() == Some("localhost"))
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::from_config(&FolioConfig::default())
    }
}

fn open_tag(tag: &str, attrs: &[(&'static str, String)], out: &mut String) {
    out.push('<');
    out.push_str(tag);
    for (name, value) in attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        escape_attribute(value, out);
        out.push('"');
    }
    out.push('>');
}

fn starts_with_newline(node: &Handle) -> bool {
    node.children
        .borrow()
        .first()
        .is_some_and(|child| match &child.data {
            NodeData::Text { contents } => contents.borrow().starts_with('\n'),
            _ => false,
        })
}

fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

/// Pre-save check for author content: emptiness, known script vectors,
/// size, and nesting depth.
pub fn validate_content(content: &str) -> ContentValidation {
    let mut errors = Vec::new();

    if content.trim().is_empty() {
        errors.push("Content cannot be empty".to_string());
        return ContentValidation {
            is_valid: false,
            errors,
        };
    }

    if SUSPICIOUS_PATTERNS.iter().any(|re| re.is_match(content)) {
        errors.push("Content contains potentially unsafe elements".to_string());
    }

    if content.len() > MAX_CONTENT_BYTES {
        errors.push("Content is too long (maximum 100KB)".to_string());
    }

    if nesting_depth(content) > MAX_NESTING {
        errors.push("Content has excessive HTML nesting".to_string());
    }

    ContentValidation {
        is_valid: errors.is_empty(),
        errors,
    }
}

/// Deepest element nesting in the parsed content.
fn nesting_depth(content: &str) -> usize {
    let root = html::parse(content);
    let mut deepest = 0;
    let mut stack: Vec<(Handle, usize)> = root
        .children
        .borrow()
        .iter()
        .map(|child| (child.clone(), 1))
        .collect();

    while let Some((node, depth)) = stack.pop() {
        if !matches!(node.data, NodeData::Element { .. }) {
            continue;
        }
        deepest = deepest.max(depth);
        stack.extend(
            node.children
                .borrow()
                .iter()
                .map(|child| (child.clone(), depth + 1)),
        );
    }

    deepest
}
