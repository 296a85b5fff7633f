use crate::error::{BlogError, Result};
use crate::types::{Author, Comment};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

/// A comment with its replies, as returned to readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<CommentNode>,
}

impl CommentNode {
    /// Number of comments in this subtree, including this one.
    pub fn count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.replies.iter());
        }
        count
    }
}

/// Thread a flat comment list into a forest.
///
/// A comment hangs below its parent when the parent is in the list;
/// otherwise it is a root. Roots and replies keep the input order. Comments
/// caught in a parent cycle, including one naming itself, are never reachable
/// from a root and are left out along with their replies.
pub fn build_tree(comments: &[Comment]) -> Vec<CommentNode> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(comments.len());
    for (i, comment) in comments.iter().enumerate() {
        index.entry(comment.id.as_str()).or_insert(i);
    }

    let mut roots: Vec<usize> = Vec::new();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); comments.len()];
    for (i, comment) in comments.iter().enumerate() {
        let parent = comment
            .parent_id
            .as_deref()
            .and_then(|id| index.get(id).copied());
        match parent {
            Some(p) => children[p].push(i),
            None => roots.push(i),
        }
    }

    // Post-order assembly with an explicit stack; reply chains can be deep
    let mut built: Vec<Option<CommentNode>> = vec![None; comments.len()];
    let mut stack: Vec<(usize, bool)> = roots.iter().rev().map(|&r| (r, false)).collect();
    while let Some((i, expanded)) = stack.pop() {
        if expanded {
            let replies = children[i]
                .iter()
                .filter_map(|&c| built[c].take())
                .collect();
            built[i] = Some(CommentNode {
                comment: comments[i].clone(),
                replies,
            });
        } else {
            stack.push((i, true));
            stack.extend(children[i].iter().rev().map(|&c| (c, false)));
        }
    }

    let forest: Vec<CommentNode> = roots.iter().filter_map(|&r| built[r].take()).collect();

    let reachable: usize = forest.iter().map(CommentNode::count).sum();
    if reachable < comments.len() {
        tracing::warn!(
            dropped = comments.len() - reachable,
            "comments in parent cycles left out of thread"
        );
    }

    forest
}

/// A reader's comment submission
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub name: String,
    pub email: String,
    pub content: String,
    #[serde(default)]
    pub parent_id: Option<String>,
}

impl NewComment {
    /// Check required fields and return the normalized author.
    pub fn validate(&self) -> Result<Author> {
        let name = self.name.trim();
        let email = self.email.trim().to_lowercase();

        if name.is_empty() || email.is_empty() || self.content.trim().is_empty() {
            return Err(BlogError::Validation(
                "name, email, and content are required".to_string(),
            ));
        }
        if !EMAIL.is_match(&email) {
            return Err(BlogError::Validation("invalid email format".to_string()));
        }

        Ok(Author {
            name: name.to_string(),
            email,
        })
    }
}
