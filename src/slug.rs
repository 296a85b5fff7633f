use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

// Same set as JavaScript's encodeURIComponent
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

const HEADING_ID_MAX_LEN: usize = 50;

/// Turn a title into a URL-safe slug
/// - Lowercases
/// - Replaces whitespace runs with a hyphen
/// - Drops everything but ASCII letters, digits and hyphens
/// - Collapses repeated hyphens and trims them from both ends
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_hyphen = false;

    for ch in input.chars().flat_map(char::to_lowercase) {
        if ch.is_whitespace() || ch == '-' {
            pending_hyphen = true;
        } else if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch);
        }
    }

    slug
}

/// Anchor id for a heading: the slug capped at 50 characters.
pub fn heading_id(text: &str) -> String {
    let mut id = slugify(text);
    // slugify output is ASCII, so byte truncation is safe
    id.truncate(HEADING_ID_MAX_LEN);
    id
}

/// Percent-encode a value for use inside a URL query component
pub fn encode_component(input: &str) -> String {
    utf8_percent_encode(input, COMPONENT).to_string()
}

/// Decode a percent-encoded value, keeping the input when it is not UTF-8
pub fn decode_component(input: &str) -> String {
    percent_decode_str(input)
        .decode_utf8()
        .unwrap_or_else(|_| std::borrow::Cow::Borrowed(input))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_title() {
        assert_eq!(slugify("Django REST Framework"), "django-rest-framework");
        assert_eq!(slugify("  Hello,   World! "), "hello-world");
        assert_eq!(slugify("C++ -- tips & tricks"), "c-tips-tricks");
    }

    #[test]
    fn test_slugify_drops_non_ascii() {
        assert_eq!(slugify("Café au lait"), "caf-au-lait");
        assert_eq!(slugify("한글"), "");
    }

    #[test]
    fn test_hyphens_between_dropped_characters() {
        // "a & b" loses the ampersand but keeps a single separator
        assert_eq!(slugify("a & b"), "a-b");
        assert_eq!(slugify("---lead and trail---"), "lead-and-trail");
    }

    #[test]
    fn test_heading_id_is_capped() {
        let long = "word ".repeat(30);
        let id = heading_id(&long);
        assert_eq!(id.len(), 50);
        assert!(id.starts_with("word-word"));
    }

    #[test]
    fn test_encode_component() {
        assert_eq!(encode_component("a b&c"), "a%20b%26c");
        assert_eq!(encode_component("https://x.io/p?q=1"), "https%3A%2F%2Fx.io%2Fp%3Fq%3D1");
    }

    #[test]
    fn test_decode_component() {
        let encoded = encode_component("한글 테스트");
        assert_eq!(decode_component(&encoded), "한글 테스트");
    }
}
