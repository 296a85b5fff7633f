use crate::error::{BlogError, Result};
use crate::types::Frontmatter;
use std::fs;
use std::path::Path;

/// A markdown file read from disk, not yet turned into a post
#[derive(Debug, Clone)]
pub struct Document {
    /// File stem, used as the slug candidate
    pub stem: String,
    pub frontmatter: Frontmatter,
    pub content: String,
}

pub struct Parser;

impl Parser {
    /// Parse a markdown file and extract frontmatter + content
    pub fn parse_file(path: &Path) -> Result<Document> {
        let raw = fs::read_to_string(path)?;

        let (frontmatter_str, markdown) = Self::split_frontmatter(&raw).ok_or_else(|| {
            BlogError::Validation(format!("{}: missing frontmatter", path.display()))
        })?;
        let frontmatter: Frontmatter = serde_yaml::from_str(frontmatter_str)?;
        let stem = Self::path_to_stem(path)?;

        Ok(Document {
            stem,
            frontmatter,
            content: markdown.to_string(),
        })
    }

    /// Split content into frontmatter and markdown
    /// Expected format:
    /// ---
    /// frontmatter here
    /// ---
    /// markdown here
    fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
        let rest = content.trim_start().strip_prefix("---")?;
        let parts: Vec<&str> = rest.splitn(2, "\n---").collect();

        if parts.len() < 2 {
            return None;
        }

        // The closing fence may be followed by trailing characters on its line
        let body = parts[1].split_once('\n').map_or("", |(_, body)| body);
        Some((parts[0].trim(), body.trim()))
    }

    /// Example: posts/dev/my-post.md → my-post
    fn path_to_stem(path: &Path) -> Result<String> {
        path.file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.to_string())
            .ok_or_else(|| BlogError::Validation(format!("invalid file path: {}", path.display())))
    }
}
