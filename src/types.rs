use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A blog post as stored in the collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    /// URL slug, derived from the title and unique within the store
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Raw markdown / HTML body as written by the author
    pub content: String,
    #[serde(default, deserialize_with = "deserialize_tag_names")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner_image: Option<String>,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub likes: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, alias = "isPublished")]
    pub published: bool,
    /// Estimated reading time in minutes
    #[serde(default)]
    pub read_time: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub email: String,
}

/// A reader comment. Replies are never stored on the record itself; see
/// [`crate::comments::CommentNode`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    #[serde(alias = "blogId")]
    pub post_id: String,
    pub author: Author,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, alias = "isApproved")]
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Like,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    pub post_id: String,
    /// Opaque reader identifier (session, account or client address)
    pub reader: String,
    pub kind: ReactionKind,
    pub created_at: DateTime<Utc>,
}

/// Tags arrive either as plain names or as references to a tag record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Tag {
    Name(String),
    Reference {
        id: TagId,
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        slug: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagId {
    Number(u64),
    Text(String),
}

impl Tag {
    pub fn name(&self) -> &str {
        match self {
            Tag::Name(name) => name,
            Tag::Reference { name, .. } => name,
        }
    }
}

/// Reduce tags to trimmed, non-empty names, dropping case-insensitive duplicates.
pub fn normalize_tags<I>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = Tag>,
{
    let mut names: Vec<String> = Vec::new();

    for tag in tags {
        let name = tag.name().trim();
        if name.is_empty() {
            continue;
        }
        if names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
            continue;
        }
        names.push(name.to_string());
    }

    names
}

fn deserialize_tag_names<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let tags = Vec::<Tag>::deserialize(deserializer)?;
    Ok(normalize_tags(tags))
}

/// YAML frontmatter of an imported markdown post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frontmatter {
    pub title: String,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_tag_names")]
    pub tags: Vec<String>,
    #[serde(default, alias = "featured_image")]
    pub banner_image: Option<String>,
    #[serde(default)]
    pub draft: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_tag_shapes_normalize_to_names() {
        let json = r#"{
            "id": "1",
            "slug": "hello",
            "title": "Hello",
            "content": "body",
            "tags": ["Rust", {"id": 7, "name": "Django", "slug": "django"}, "rust", "  "],
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z"
        }"#;

        let post: Post = serde_json::from_str(json).unwrap();
        assert_eq!(post.tags, vec!["Rust", "Django"]);
        assert!(!post.published);
        assert_eq!(post.views, 0);
    }

    #[test]
    fn test_comment_accepts_legacy_field_names() {
        let json = r#"{
            "id": "c1",
            "blogId": "1",
            "author": {"name": "Ann", "email": "ann@example.com"},
            "content": "Nice",
            "isApproved": true,
            "createdAt": "2024-01-01T00:00:00Z"
        }"#;

        let comment: Comment = serde_json::from_str(json).unwrap();
        assert_eq!(comment.post_id, "1");
        assert!(comment.approved);
        assert_eq!(comment.parent_id, None);
    }

    #[test]
    fn test_tag_reference_with_text_id() {
        let tag: Tag = serde_json::from_str(r#"{"id": "t-1", "name": "Laravel"}"#).unwrap();
        assert_eq!(tag.name(), "Laravel");
    }
}
