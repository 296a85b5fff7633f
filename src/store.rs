use crate::error::{BlogError, Result};
use crate::types::{Comment, Post, Reaction, ReactionKind};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Persistence contract for posts, comments and reactions.
///
/// Lists come back in insertion order; the listing pipeline does its own
/// ordering.
pub trait BlogRepository {
    // Post operations
    fn list_posts(&self) -> Result<Vec<Post>>;
    fn get_post(&self, slug: &str) -> Result<Option<Post>>;
    fn insert_post(&mut self, post: Post) -> Result<()>;
    /// Replace the stored post with the same id.
    fn update_post(&mut self, post: Post) -> Result<()>;
    /// Remove a post together with its comments and reactions.
    fn delete_post(&mut self, id: &str) -> Result<()>;

    // Comment operations
    fn list_comments(&self, post_id: &str) -> Result<Vec<Comment>>;
    fn get_comment(&self, id: &str) -> Result<Option<Comment>>;
    fn insert_comment(&mut self, comment: Comment) -> Result<()>;

    // Reaction operations
    fn find_reaction(
        &self,
        post_id: &str,
        reader: &str,
        kind: ReactionKind,
    ) -> Result<Option<Reaction>>;
    fn insert_reaction(&mut self, reaction: Reaction) -> Result<()>;
    fn remove_reaction(&mut self, post_id: &str, reader: &str, kind: ReactionKind) -> Result<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Collections {
    #[serde(default)]
    posts: Vec<Post>,
    #[serde(default)]
    comments: Vec<Comment>,
    #[serde(default)]
    reactions: Vec<Reaction>,
}

/// Collections held in memory, optionally backed by a JSON file.
#[derive(Debug, Default)]
pub struct JsonStore {
    path: Option<PathBuf>,
    data: Collections,
}

impl JsonStore {
    /// Open the store at `path`, starting empty when the file does not exist yet.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let data = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            tracing::debug!(path = %path.display(), "no data file yet, starting empty");
            Collections::default()
        };

        Ok(Self {
            path: Some(path),
            data,
        })
    }

    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Write the collections back to the data file; a no-op for in-memory stores.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.data)?;
        fs::write(path, json)?;

        tracing::debug!(path = %path.display(), "saved data file");
        Ok(())
    }

    fn post_index(&self, id: &str) -> Result<usize> {
        self.data
            .posts
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| BlogError::NotFound("post", id.to_string()))
    }
}

impl BlogRepository for JsonStore {
    fn list_posts(&self) -> Result<Vec<Post>> {
        Ok(self.data.posts.clone())
    }

    fn get_post(&self, slug: &str) -> Result<Option<Post>> {
        Ok(self.data.posts.iter().find(|p| p.slug == slug).cloned())
    }

    fn insert_post(&mut self, post: Post) -> Result<()> {
        if self.data.posts.iter().any(|p| p.id == post.id || p.slug == post.slug) {
            return Err(BlogError::Conflict(format!("post {} already exists", post.slug)));
        }

        tracing::info!(id = %post.id, slug = %post.slug, "inserted post");
        self.data.posts.push(post);
        Ok(())
    }

    fn update_post(&mut self, post: Post) -> Result<()> {
        let index = self.post_index(&post.id)?;
        if self
            .data
            .posts
            .iter()
            .any(|p| p.id != post.id && p.slug == post.slug)
        {
            return Err(BlogError::Conflict(format!("slug {} is taken", post.slug)));
        }

        tracing::info!(id = %post.id, slug = %post.slug, "updated post");
        self.data.posts[index] = post;
        Ok(())
    }

    fn delete_post(&mut self, id: &str) -> Result<()> {
        let index = self.post_index(id)?;
        let post = self.data.posts.remove(index);
        self.data.comments.retain(|c| c.post_id != id);
        self.data.reactions.retain(|r| r.post_id != id);

        tracing::info!(id, slug = %post.slug, "deleted post");
        Ok(())
    }

    fn list_comments(&self, post_id: &str) -> Result<Vec<Comment>> {
        Ok(self
            .data
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect())
    }

    fn get_comment(&self, id: &str) -> Result<Option<Comment>> {
        Ok(self.data.comments.iter().find(|c| c.id == id).cloned())
    }

    fn insert_comment(&mut self, comment: Comment) -> Result<()> {
        if self.data.comments.iter().any(|c| c.id == comment.id) {
            return Err(BlogError::Conflict(format!("comment {} already exists", comment.id)));
        }

        tracing::info!(id = %comment.id, post_id = %comment.post_id, "inserted comment");
        self.data.comments.push(comment);
        Ok(())
    }

    fn find_reaction(
        &self,
        post_id: &str,
        reader: &str,
        kind: ReactionKind,
    ) -> Result<Option<Reaction>> {
        Ok(self
            .data
            .reactions
            .iter()
            .find(|r| r.post_id == post_id && r.reader == reader && r.kind == kind)
            .cloned())
    }

    fn insert_reaction(&mut self, reaction: Reaction) -> Result<()> {
        self.data.reactions.push(reaction);
        Ok(())
    }

    fn remove_reaction(&mut self, post_id: &str, reader: &str, kind: ReactionKind) -> Result<()> {
        self.data
            .reactions
            .retain(|r| !(r.post_id == post_id && r.reader == reader && r.kind == kind));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Author;
    use chrono::Utc;
    use tempfile::TempDir;

    fn post(id: &str, slug: &str) -> Post {
        let now = Utc::now();
        Post {
            id: id.to_string(),
            slug: slug.to_string(),
            title: slug.to_string(),
            description: String::new(),
            content: "body".to_string(),
            tags: Vec::new(),
            banner_image: None,
            views: 0,
            likes: 0,
            created_at: now,
            updated_at: now,
            published: true,
            read_time: 1,
        }
    }

    fn comment(id: &str, post_id: &str) -> Comment {
        Comment {
            id: id.to_string(),
            post_id: post_id.to_string(),
            author: Author {
                name: "Ann".to_string(),
                email: "ann@example.com".to_string(),
            },
            content: "hi".to_string(),
            parent_id: None,
            approved: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_save_and_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/data.json");

        let mut store = JsonStore::open(&path).unwrap();
        store.insert_post(post("1", "hello")).unwrap();
        store.insert_comment(comment("c1", "1")).unwrap();
        store.save().unwrap();

        let reopened = JsonStore::open(&path).unwrap();
        assert_eq!(reopened.list_posts().unwrap().len(), 1);
        assert_eq!(reopened.get_post("hello").unwrap().unwrap().id, "1");
        assert_eq!(reopened.list_comments("1").unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_slug_conflicts() {
        let mut store = JsonStore::in_memory();
        store.insert_post(post("1", "hello")).unwrap();
        let err = store.insert_post(post("2", "hello")).unwrap_err();
        assert!(matches!(err, BlogError::Conflict(_)));
    }

    #[test]
    fn test_update_missing_post() {
        let mut store = JsonStore::in_memory();
        let err = store.update_post(post("1", "hello")).unwrap_err();
        assert!(matches!(err, BlogError::NotFound("post", _)));
    }

    #[test]
    fn test_delete_cascades() {
        let mut store = JsonStore::in_memory();
        store.insert_post(post("1", "one")).unwrap();
        store.insert_post(post("2", "two")).unwrap();
        store.insert_comment(comment("c1", "1")).unwrap();
        store.insert_comment(comment("c2", "2")).unwrap();
        store
            .insert_reaction(Reaction {
                post_id: "1".to_string(),
                reader: "r".to_string(),
                kind: ReactionKind::Like,
                created_at: Utc::now(),
            })
            .unwrap();

        store.delete_post("1").unwrap();

        assert!(store.get_post("one").unwrap().is_none());
        assert!(store.list_comments("1").unwrap().is_empty());
        assert_eq!(store.list_comments("2").unwrap().len(), 1);
        assert!(store
            .find_reaction("1", "r", ReactionKind::Like)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_in_memory_save_is_noop() {
        let store = JsonStore::in_memory();
        assert!(store.save().is_ok());
    }
}
