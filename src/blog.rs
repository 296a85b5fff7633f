//! Blog operations on top of a [`BlogRepository`]: post administration,
//! public reads, likes, comments and markdown import.

use crate::analyzer::{analyze, excerpt, ContentMetadata};
use crate::comments::{build_tree, CommentNode, NewComment};
use crate::config::{BlogConfig, FolioConfig};
use crate::error::{BlogError, Result};
use crate::parser::Parser;
use crate::query::{tag_counts, ListQuery, Page, SortOrder, TagCount, TagSort};
use crate::renderer::Renderer;
use crate::sanitizer::Sanitizer;
use crate::slug::slugify;
use crate::store::BlogRepository;
use crate::toc::{toc_from_html, TocItem};
use crate::types::{normalize_tags, Comment, Post, Reaction, ReactionKind, Tag};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;
use walkdir::WalkDir;

/// Admin input for a new post
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub title: String,
    pub description: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub banner_image: Option<String>,
    #[serde(default)]
    pub published: bool,
}

/// Partial update; `None` leaves a field as it is
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<Tag>>,
    pub banner_image: Option<String>,
    pub published: Option<bool>,
}

/// A post ready for display
#[derive(Debug, Clone, Serialize)]
pub struct RenderedPost {
    pub post: Post,
    pub html: String,
    pub metadata: ContentMetadata,
    pub toc: Vec<TocItem>,
    pub excerpt: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeStatus {
    pub liked: bool,
    pub likes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub imported: Vec<String>,
    pub skipped: Vec<String>,
}

pub struct BlogService<R> {
    repo: R,
    renderer: Renderer,
    sanitizer: Sanitizer,
    config: BlogConfig,
}

impl<R: BlogRepository> BlogService<R> {
    pub fn new(repo: R, config: &FolioConfig) -> Self {
        Self {
            repo,
            renderer: Renderer::new(),
            sanitizer: Sanitizer::from_config(config),
            config: config.blog.clone(),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn create_post(&mut self, input: NewPost) -> Result<Post> {
        require("title", &input.title)?;
        require("description", &input.description)?;
        require("content", &input.content)?;

        let slug = self.unique_slug(&input.title, None)?;
        let now = Utc::now();
        let post = Post {
            id: Uuid::new_v4().to_string(),
            slug,
            title: input.title.trim().to_string(),
            description: input.description.trim().to_string(),
            read_time: self.render_markdown(&input.content).1.reading_time_minutes,
            content: input.content,
            tags: normalize_tags(input.tags),
            banner_image: input.banner_image.filter(|url| !url.trim().is_empty()),
            views: 0,
            likes: 0,
            created_at: now,
            updated_at: now,
            published: input.published,
        };

        self.repo.insert_post(post.clone())?;
        Ok(post)
    }

    pub fn update_post(&mut self, slug: &str, update: PostUpdate) -> Result<Post> {
        let mut post = self.get_post(slug)?;

        if let Some(title) = update.title {
            require("title", &title)?;
            let title = title.trim().to_string();
            if title != post.title {
                post.slug = self.unique_slug(&title, Some(&post.id))?;
                post.title = title;
            }
        }
        if let Some(description) = update.description {
            require("description", &description)?;
            post.description = description.trim().to_string();
        }
        if let Some(content) = update.content {
            require("content", &content)?;
            post.read_time = self.render_markdown(&content).1.reading_time_minutes;
            post.content = content;
        }
        if let Some(tags) = update.tags {
            post.tags = normalize_tags(tags);
        }
        if let Some(banner) = update.banner_image {
            post.banner_image = Some(banner).filter(|url| !url.trim().is_empty());
        }
        if let Some(published) = update.published {
            post.published = published;
        }

        post.updated_at = Utc::now();
        self.repo.update_post(post.clone())?;
        Ok(post)
    }

    pub fn delete_post(&mut self, slug: &str) -> Result<Post> {
        let post = self.get_post(slug)?;
        self.repo.delete_post(&post.id)?;
        Ok(post)
    }

    /// Listing for readers; drafts only show up for admins.
    pub fn list_posts(&self, query: &ListQuery, include_drafts: bool) -> Result<Page<Post>> {
        let posts: Vec<Post> = self
            .repo
            .list_posts()?
            .into_iter()
            .filter(|p| include_drafts || p.published)
            .collect();

        Ok(query
            .clone()
            .with_max_page_size(self.config.max_page_size)
            .apply(posts))
    }

    /// Public detail read: counts a view and renders the body.
    pub fn view_post(&mut self, slug: &str) -> Result<RenderedPost> {
        let mut post = self
            .repo
            .get_post(slug)?
            .filter(|p| p.published)
            .ok_or_else(|| BlogError::NotFound("post", slug.to_string()))?;

        post.views += 1;
        self.repo.update_post(post.clone())?;

        Ok(self.render_post(&post))
    }

    /// Markdown -> highlighted HTML -> sanitized HTML, plus its metadata and outline.
    pub fn render_post(&self, post: &Post) -> RenderedPost {
        let (html, metadata) = self.render_markdown(&post.content);
        let toc = toc_from_html(&html);
        let excerpt = if post.description.trim().is_empty() {
            excerpt(&html, self.config.excerpt_length)
        } else {
            post.description.clone()
        };

        RenderedPost {
            post: post.clone(),
            html,
            metadata,
            toc,
            excerpt,
        }
    }

    pub fn toggle_like(&mut self, slug: &str, reader: &str) -> Result<LikeStatus> {
        let mut post = self.get_post(slug)?;
        let existing = self.repo.find_reaction(&post.id, reader, ReactionKind::Like)?;

        let liked = match existing {
            Some(_) => {
                self.repo.remove_reaction(&post.id, reader, ReactionKind::Like)?;
                post.likes = post.likes.saturating_sub(1);
                false
            }
            None => {
                self.repo.insert_reaction(Reaction {
                    post_id: post.id.clone(),
                    reader: reader.to_string(),
                    kind: ReactionKind::Like,
                    created_at: Utc::now(),
                })?;
                post.likes += 1;
                true
            }
        };

        self.repo.update_post(post.clone())?;
        tracing::info!(slug, liked, likes = post.likes, "toggled like");

        Ok(LikeStatus {
            liked,
            likes: post.likes,
        })
    }

    pub fn like_status(&self, slug: &str, reader: &str) -> Result<LikeStatus> {
        let post = self.get_post(slug)?;
        let liked = self
            .repo
            .find_reaction(&post.id, reader, ReactionKind::Like)?
            .is_some();

        Ok(LikeStatus {
            liked,
            likes: post.likes,
        })
    }

    pub fn add_comment(&mut self, slug: &str, input: NewComment) -> Result<Comment> {
        let post = self.get_post(slug)?;
        let author = input.validate()?;

        if let Some(parent_id) = &input.parent_id {
            let parent = self
                .repo
                .get_comment(parent_id)?
                .filter(|c| c.post_id == post.id);
            if parent.is_none() {
                return Err(BlogError::Validation(format!(
                    "parent comment {} not found on this post",
                    parent_id
                )));
            }
        }

        let content = self.sanitizer.sanitize_user_input(&input.content);
        if content.trim().is_empty() {
            return Err(BlogError::Validation(
                "comment has no content after sanitization".to_string(),
            ));
        }

        let comment = Comment {
            id: Uuid::new_v4().to_string(),
            post_id: post.id,
            author,
            content,
            parent_id: input.parent_id,
            approved: self.config.auto_approve_comments,
            created_at: Utc::now(),
        };

        self.repo.insert_comment(comment.clone())?;
        Ok(comment)
    }

    /// Approved comments of a post, threaded.
    pub fn list_comments(&self, slug: &str) -> Result<Vec<CommentNode>> {
        let post = self.get_post(slug)?;
        let approved: Vec<Comment> = self
            .repo
            .list_comments(&post.id)?
            .into_iter()
            .filter(|c| c.approved)
            .collect();

        Ok(build_tree(&approved))
    }

    /// Tag index over published posts
    pub fn tags(&self, sort_by: TagSort, order: SortOrder) -> Result<Vec<TagCount>> {
        let published: Vec<Post> = self
            .repo
            .list_posts()?
            .into_iter()
            .filter(|p| p.published)
            .collect();

        Ok(tag_counts(&published, sort_by, order))
    }

    /// Import every `.md` file below `dir` as a post. Files that fail to
    /// parse, or whose slug is already taken, are skipped.
    pub fn import_markdown(&mut self, dir: &Path) -> Result<ImportReport> {
        if !dir.is_dir() {
            return Err(BlogError::NotFound("directory", dir.display().to_string()));
        }

        let mut report = ImportReport::default();
        let mut files: Vec<_> = WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "md"))
            .map(|e| e.into_path())
            .collect();
        files.sort();

        for path in files {
            let doc = match Parser::parse_file(&path) {
                Ok(doc) => doc,
                Err(err) => {
                    tracing::warn!(path = %path.display(), %err, "skipping unparsable post");
                    report.skipped.push(path.display().to_string());
                    continue;
                }
            };

            let title = doc.frontmatter.title.trim().to_string();
            if title.is_empty() || self.already_imported(&title, &doc.content)? {
                tracing::debug!(path = %path.display(), stem = %doc.stem, "already imported, skipping");
                report.skipped.push(path.display().to_string());
                continue;
            }

            let slug = self.unique_slug(&title, None)?;

            let (html, metadata) = self.render_markdown(&doc.content);
            let created_at = doc.frontmatter.date.unwrap_or_else(Utc::now);
            let description = doc
                .frontmatter
                .description
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| excerpt(&html, self.config.excerpt_length));

            let post = Post {
                id: Uuid::new_v4().to_string(),
                slug: slug.clone(),
                title,
                description,
                content: doc.content,
                tags: doc.frontmatter.tags,
                banner_image: doc.frontmatter.banner_image,
                views: 0,
                likes: 0,
                created_at,
                updated_at: created_at,
                published: !doc.frontmatter.draft,
                read_time: metadata.reading_time_minutes,
            };

            self.repo.insert_post(post)?;
            report.imported.push(slug);
        }

        tracing::info!(
            imported = report.imported.len(),
            skipped = report.skipped.len(),
            "markdown import finished"
        );
        Ok(report)
    }

    fn render_markdown(&self, content: &str) -> (String, ContentMetadata) {
        let rendered = self.renderer.render_markdown(content);
        let html = self.sanitizer.sanitize(&rendered);
        let metadata = analyze(&html);
        tracing::debug!(words = metadata.word_count, "rendered post body");
        (html, metadata)
    }

    pub fn get_post(&self, slug: &str) -> Result<Post> {
        self.repo
            .get_post(slug)?
            .ok_or_else(|| BlogError::NotFound("post", slug.to_string()))
    }

    /// Slug for `title`, suffixed with -2, -3, ... until no other post uses it.
    /// A file counts as imported when a post already has its title and body.
    fn already_imported(&self, title: &str, content: &str) -> Result<bool> {
        Ok(self
            .repo
            .list_posts()?
            .iter()
            .any(|p| p.title == title && p.content == content))
    }

    fn unique_slug(&self, title: &str, except_id: Option<&str>) -> Result<String> {
        let base = match slugify(title) {
            s if s.is_empty() => "post".to_string(),
            s => s,
        };

        let taken: Vec<String> = self
            .repo
            .list_posts()?
            .into_iter()
            .filter(|p| Some(p.id.as_str()) != except_id)
            .map(|p| p.slug)
            .collect();

        let mut candidate = base.clone();
        let mut n = 2;
        while taken.contains(&candidate) {
            candidate = format!("{}-{}", base, n);
            n += 1;
        }
        Ok(candidate)
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(BlogError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::SortField;
    use crate::store::JsonStore;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn service() -> BlogService<JsonStore> {
        BlogService::new(JsonStore::in_memory(), &FolioConfig::default())
    }

    fn new_post(title: &str, published: bool) -> NewPost {
        NewPost {
            title: title.to_string(),
            description: format!("About {}", title),
            content: "# Intro\n\nSome words here.\n\n## Details\n\nMore words.".to_string(),
            tags: vec![Tag::Name("Rust".to_string())],
            banner_image: None,
            published,
        }
    }

    fn comment(name: &str, content: &str, parent: Option<&str>) -> NewComment {
        NewComment {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            content: content.to_string(),
            parent_id: parent.map(str::to_string),
        }
    }

    #[test]
    fn test_create_post_derives_fields() {
        let mut blog = service();
        let post = blog.create_post(new_post("Hello, World!", true)).unwrap();

        assert_eq!(post.slug, "hello-world");
        assert_eq!(post.read_time, 1);
        assert_eq!(post.tags, vec!["Rust"]);
        assert_eq!(post.views, 0);
        assert!(!post.id.is_empty());
    }

    #[test]
    fn test_create_post_requires_fields() {
        let mut blog = service();
        let err = blog
            .create_post(NewPost {
                description: "  ".to_string(),
                ..new_post("Title", true)
            })
            .unwrap_err();
        assert!(matches!(err, BlogError::Validation(_)));
    }

    #[test]
    fn test_slugs_stay_unique() {
        let mut blog = service();
        let a = blog.create_post(new_post("Same Title", true)).unwrap();
        let b = blog.create_post(new_post("Same Title", true)).unwrap();
        let c = blog.create_post(new_post("Same  title!", true)).unwrap();

        assert_eq!(a.slug, "same-title");
        assert_eq!(b.slug, "same-title-2");
        assert_eq!(c.slug, "same-title-3");
    }

    #[test]
    fn test_update_recomputes_slug_and_read_time() {
        let mut blog = service();
        blog.create_post(new_post("Old Title", true)).unwrap();

        let updated = blog
            .update_post(
                "old-title",
                PostUpdate {
                    title: Some("New Title".to_string()),
                    content: Some("word ".repeat(450)),
                    ..PostUpdate::default()
                },
            )
            .unwrap();

        assert_eq!(updated.slug, "new-title");
        assert_eq!(updated.read_time, 3);
        assert!(updated.updated_at >= updated.created_at);
        assert!(blog.repository().get_post("old-title").unwrap().is_none());
    }

    #[test]
    fn test_update_same_title_keeps_slug() {
        let mut blog = service();
        blog.create_post(new_post("Keep", true)).unwrap();
        let updated = blog
            .update_post(
                "keep",
                PostUpdate {
                    title: Some("Keep".to_string()),
                    published: Some(false),
                    ..PostUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(updated.slug, "keep");
        assert!(!updated.published);
    }

    #[test]
    fn test_list_hides_drafts() {
        let mut blog = service();
        blog.create_post(new_post("Public", true)).unwrap();
        blog.create_post(new_post("Draft", false)).unwrap();

        let page = blog.list_posts(&ListQuery::default(), false).unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.items[0].slug, "public");

        let all = blog.list_posts(&ListQuery::default(), true).unwrap();
        assert_eq!(all.total_count, 2);
    }

    #[test]
    fn test_list_caps_page_size() {
        let mut blog = service();
        for i in 0..3 {
            blog.create_post(new_post(&format!("Post {}", i), true)).unwrap();
        }
        let query = ListQuery {
            page_size: 10_000,
            sort_by: SortField::CreatedAt,
            ..ListQuery::default()
        };
        let page = blog.list_posts(&query, false).unwrap();
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn test_view_post_counts_and_renders() {
        let mut blog = service();
        blog.create_post(new_post("Viewed", true)).unwrap();

        let first = blog.view_post("viewed").unwrap();
        let second = blog.view_post("viewed").unwrap();

        assert_eq!(first.post.views, 1);
        assert_eq!(second.post.views, 2);
        assert!(second.html.contains(r#"<h1 id="intro">Intro</h1>"#));
        assert_eq!(second.metadata.heading_count, 2);
        assert_eq!(second.toc.len(), 1);
        assert_eq!(second.toc[0].children[0].id, "details");
        assert_eq!(second.excerpt, "About Viewed");
    }

    #[test]
    fn test_view_draft_is_not_found() {
        let mut blog = service();
        blog.create_post(new_post("Hidden", false)).unwrap();
        assert!(matches!(
            blog.view_post("hidden"),
            Err(BlogError::NotFound("post", _))
        ));
    }

    #[test]
    fn test_render_strips_unsafe_markup() {
        let mut blog = service();
        let post = blog
            .create_post(NewPost {
                content: "Hi <script>alert(1)</script>[x](javascript:alert(1))".to_string(),
                ..new_post("Unsafe", true)
            })
            .unwrap();

        let rendered = blog.render_post(&post);
        assert!(!rendered.html.contains("script"));
        assert!(!rendered.html.contains("javascript:"));
    }

    #[test]
    fn test_render_highlights_code() {
        let mut blog = service();
        let post = blog
            .create_post(NewPost {
                content: "```rust\nlet x = 1;\n```".to_string(),
                ..new_post("Code", true)
            })
            .unwrap();

        let rendered = blog.render_post(&post);
        assert!(rendered.html.contains(r#"<pre class="syntax-highlight"><code>"#));
    }

    #[test]
    fn test_toggle_like() {
        let mut blog = service();
        blog.create_post(new_post("Liked", true)).unwrap();

        assert_eq!(
            blog.toggle_like("liked", "reader-1").unwrap(),
            LikeStatus { liked: true, likes: 1 }
        );
        assert_eq!(
            blog.toggle_like("liked", "reader-2").unwrap(),
            LikeStatus { liked: true, likes: 2 }
        );
        assert_eq!(
            blog.toggle_like("liked", "reader-1").unwrap(),
            LikeStatus { liked: false, likes: 1 }
        );
        assert_eq!(
            blog.like_status("liked", "reader-2").unwrap(),
            LikeStatus { liked: true, likes: 1 }
        );
    }

    #[test]
    fn test_comments_threaded_and_sanitized() {
        let mut blog = service();
        blog.create_post(new_post("Discussed", true)).unwrap();

        let root = blog
            .add_comment("discussed", comment("Ann", "<b>Great</b><img src=x>", None))
            .unwrap();
        assert_eq!(root.content, "<b>Great</b>");
        assert_eq!(root.author.email, "ann@example.com");

        blog.add_comment("discussed", comment("Bob", "Thanks", Some(&root.id)))
            .unwrap();

        let tree = blog.list_comments("discussed").unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].replies[0].comment.author.name, "Bob");
    }

    #[test]
    fn test_comment_parent_must_be_on_same_post() {
        let mut blog = service();
        blog.create_post(new_post("One", true)).unwrap();
        blog.create_post(new_post("Two", true)).unwrap();
        let other = blog
            .add_comment("one", comment("Ann", "hi", None))
            .unwrap();

        let err = blog
            .add_comment("two", comment("Bob", "reply", Some(&other.id)))
            .unwrap_err();
        assert!(matches!(err, BlogError::Validation(_)));
    }

    #[test]
    fn test_unapproved_comments_hidden() {
        let mut config = FolioConfig::default();
        config.blog.auto_approve_comments = false;
        let mut blog = BlogService::new(JsonStore::in_memory(), &config);
        blog.create_post(new_post("Moderated", true)).unwrap();

        let c = blog
            .add_comment("moderated", comment("Ann", "pending", None))
            .unwrap();
        assert!(!c.approved);
        assert!(blog.list_comments("moderated").unwrap().is_empty());
    }

    #[test]
    fn test_script_only_comment_rejected() {
        let mut blog = service();
        blog.create_post(new_post("Quiet", true)).unwrap();
        let err = blog
            .add_comment("quiet", comment("Eve", "<script>x()</script>", None))
            .unwrap_err();
        assert!(matches!(err, BlogError::Validation(_)));
    }

    #[test]
    fn test_delete_post() {
        let mut blog = service();
        blog.create_post(new_post("Gone", true)).unwrap();
        blog.add_comment("gone", comment("Ann", "bye", None)).unwrap();

        let deleted = blog.delete_post("gone").unwrap();
        assert_eq!(deleted.slug, "gone");
        assert!(matches!(
            blog.list_comments("gone"),
            Err(BlogError::NotFound("post", _))
        ));
        assert!(blog
            .repository()
            .list_comments(&deleted.id)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_tags_count_published_only() {
        let mut blog = service();
        blog.create_post(new_post("A", true)).unwrap();
        blog.create_post(NewPost {
            tags: vec![Tag::Name("Go".to_string())],
            ..new_post("B", false)
        })
        .unwrap();

        let tags = blog.tags(TagSort::Count, SortOrder::Desc).unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "Rust");
    }

    #[test]
    fn test_import_markdown() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        fs::create_dir_all(dir.join("dev")).unwrap();
        fs::write(
            dir.join("dev/first-post.md"),
            "---\ntitle: First Post\ndate: 2024-03-01T10:00:00Z\ntags: [Rust]\n---\n\n# Hello\n\nBody text.\n",
        )
        .unwrap();
        fs::write(
            dir.join("draft.md"),
            "---\ntitle: Draft\ndraft: true\ndescription: Not yet\n---\nSoon.\n",
        )
        .unwrap();
        fs::write(
            dir.join("zz-repost.md"),
            "---\ntitle: First Post!\n---\nA different body.\n",
        )
        .unwrap();
        fs::write(dir.join("broken.md"), "no frontmatter").unwrap();
        fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let mut blog = service();
        let report = blog.import_markdown(dir).unwrap();

        // Slugs come from titles; a clashing title gets a suffix
        assert_eq!(report.imported, vec!["first-post", "draft", "first-post-2"]);
        assert_eq!(report.skipped.len(), 1);

        let first = blog.repository().get_post("first-post").unwrap().unwrap();
        assert_eq!(first.title, "First Post");
        assert_eq!(first.description, "Hello Body text.");
        assert!(first.published);
        assert_eq!(first.created_at.to_rfc3339(), "2024-03-01T10:00:00+00:00");

        let draft = blog.repository().get_post("draft").unwrap().unwrap();
        assert!(!draft.published);
        assert_eq!(draft.description, "Not yet");

        let repost = blog.repository().get_post("first-post-2").unwrap().unwrap();
        assert_eq!(repost.title, "First Post!");

        // A second run recognizes every file it already imported
        let again = blog.import_markdown(dir).unwrap();
        assert!(again.imported.is_empty());
        assert_eq!(again.skipped.len(), 4);
        assert_eq!(blog.repository().list_posts().unwrap().len(), 3);
    }
}
