//! Listing pipeline: search, tag filter, stable sort and pagination.
//!
//! Each stage takes the previous stage's full result and returns a new
//! collection, so totals reported by [`paginate`] are post-filter counts.

use crate::slug::slugify;
use crate::types::Post;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Anything that can be listed: searched, tag-filtered and sorted.
pub trait Listing {
    fn title(&self) -> &str;
    fn description(&self) -> &str;
    fn content(&self) -> &str;
    fn tags(&self) -> &[String];
    fn created_at(&self) -> DateTime<Utc>;
    fn views(&self) -> u64;
    fn likes(&self) -> u64;
}

impl Listing for Post {
    fn title(&self) -> &str {
        &self.title
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn content(&self) -> &str {
        &self.content
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn views(&self) -> u64 {
        self.views
    }

    fn likes(&self) -> u64 {
        self.likes
    }
}

impl<T: Listing + ?Sized> Listing for &T {
    fn title(&self) -> &str {
        (**self).title()
    }

    fn description(&self) -> &str {
        (**self).description()
    }

    fn content(&self) -> &str {
        (**self).content()
    }

    fn tags(&self) -> &[String] {
        (**self).tags()
    }

    fn created_at(&self) -> DateTime<Utc> {
        (**self).created_at()
    }

    fn views(&self) -> u64 {
        (**self).views()
    }

    fn likes(&self) -> u64 {
        (**self).likes()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    #[value(name = "createdAt", alias = "created-at")]
    CreatedAt,
    Views,
    Likes,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

/// Case-insensitive substring match over title, description, tags and
/// content. A blank query keeps everything.
pub fn search<T: Listing>(items: Vec<T>, query: &str) -> Vec<T> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return items;
    }

    items
        .into_iter()
        .filter(|item| {
            item.title().to_lowercase().contains(&needle)
                || item.description().to_lowercase().contains(&needle)
                || item
                    .tags()
                    .iter()
                    .any(|tag| tag.to_lowercase().contains(&needle))
                || item.content().to_lowercase().contains(&needle)
        })
        .collect()
}

/// Case-insensitive exact tag match. An empty tag keeps everything.
pub fn filter_by_tag<T: Listing>(items: Vec<T>, tag: &str) -> Vec<T> {
    let tag = tag.trim().to_lowercase();
    if tag.is_empty() {
        return items;
    }

    items
        .into_iter()
        .filter(|item| item.tags().iter().any(|t| t.to_lowercase() == tag))
        .collect()
}

/// Stable sort; ties keep their input order.
pub fn sort<T: Listing>(mut items: Vec<T>, field: SortField, order: SortOrder) -> Vec<T> {
    items.sort_by(|a, b| {
        let ordering = match field {
            SortField::CreatedAt => a.created_at().cmp(&b.created_at()),
            SortField::Views => a.views().cmp(&b.views()),
            SortField::Likes => a.likes().cmp(&b.likes()),
        };
        order.apply(ordering)
    });
    items
}

/// One page of a listing plus the numbers needed to render a pager
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: usize,
    pub current_page: usize,
    pub total_pages: usize,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

/// Slice out a 1-based page. `page` and `page_size` below 1 count as 1;
/// pages past the end are empty.
pub fn paginate<T>(items: Vec<T>, page: i64, page_size: i64) -> Page<T> {
    let page = usize::try_from(page.max(1)).unwrap_or(usize::MAX);
    let page_size = usize::try_from(page_size.max(1)).unwrap_or(usize::MAX);

    let total_count = items.len();
    let total_pages = total_count.div_ceil(page_size);
    let start = (page - 1).saturating_mul(page_size);

    let items = items.into_iter().skip(start).take(page_size).collect();

    Page {
        items,
        total_count,
        current_page: page,
        total_pages,
        has_next_page: page < total_pages,
        has_prev_page: page > 1,
    }
}

/// Listing parameters as callers pass them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListQuery {
    pub search: Option<String>,
    pub tag: Option<String>,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
    pub page: i64,
    pub page_size: i64,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            search: None,
            tag: None,
            sort_by: SortField::default(),
            sort_order: SortOrder::default(),
            page: 1,
            page_size: 10,
        }
    }
}

impl ListQuery {
    /// Cap the page size at `max`.
    pub fn with_max_page_size(mut self, max: usize) -> Self {
        let max = i64::try_from(max).unwrap_or(i64::MAX);
        self.page_size = self.page_size.min(max);
        self
    }

    /// search -> tag filter -> sort -> paginate
    pub fn apply<T: Listing>(&self, items: Vec<T>) -> Page<T> {
        let items = search(items, self.search.as_deref().unwrap_or_default());
        let items = filter_by_tag(items, self.tag.as_deref().unwrap_or_default());
        let items = sort(items, self.sort_by, self.sort_order);
        paginate(items, self.page, self.page_size)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TagSort {
    #[default]
    Count,
    Name,
}

/// A tag with the number of listings carrying it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub name: String,
    pub slug: String,
    pub count: usize,
}

/// Count tags across `items`. Tags differing only in case are merged under
/// the first spelling seen.
pub fn tag_counts<T: Listing>(items: &[T], sort_by: TagSort, order: SortOrder) -> Vec<TagCount> {
    let mut counts: Vec<TagCount> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for item in items {
        for tag in item.tags() {
            let key = tag.to_lowercase();
            match index.get(&key) {
                Some(&i) => counts[i].count += 1,
                None => {
                    index.insert(key, counts.len());
                    counts.push(TagCount {
                        name: tag.clone(),
                        slug: slugify(tag),
                        count: 1,
                    });
                }
            }
        }
    }

    counts.sort_by(|a, b| {
        let ordering = match sort_by {
            TagSort::Count => a.count.cmp(&b.count),
            TagSort::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        };
        order.apply(ordering)
    });
    counts
}
