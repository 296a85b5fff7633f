//! Content core of a portfolio blog: HTML sanitization, content analysis,
//! tables of contents, threaded comments and the post listing pipeline,
//! with a small service layer over a JSON-file store.

pub mod analyzer;
pub mod blog;
pub mod comments;
pub mod config;
pub mod error;
pub mod html;
pub mod parser;
pub mod query;
pub mod renderer;
pub mod sanitizer;
pub mod share;
pub mod slug;
pub mod store;
pub mod toc;
pub mod types;

pub use analyzer::{analyze, ContentMetadata};
pub use blog::{BlogService, LikeStatus, NewPost, PostUpdate, RenderedPost};
pub use comments::{build_tree, CommentNode, NewComment};
pub use config::{load_config, FolioConfig};
pub use error::{BlogError, Result};
pub use query::{filter_by_tag, paginate, search, sort, ListQuery, Page, SortField, SortOrder};
pub use sanitizer::{validate_content, ContentValidation, Sanitizer};
pub use store::{BlogRepository, JsonStore};
pub use toc::{build_toc, TocItem};
pub use types::{Author, Comment, Post, Tag};
