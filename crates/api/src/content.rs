//! Markdown blog posts.
//!
//! Posts are loaded once at startup from `<content_dir>/blog/*.md`. Each file
//! carries YAML frontmatter and a markdown body, which is rendered to HTML
//! up front so requests only read from memory.
//!
//! A filename like `2025-01-15-bpc-157-basics.md` yields the slug
//! `bpc-157-basics`; files without a date prefix use the whole stem.

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use comrak::{Options, markdown_to_html};
use gray_matter::{Matter, ParsedEntity, engine::YAML};
use serde::{Deserialize, Serialize};

/// Metadata for blog posts
#[derive(Debug, Clone, Deserialize)]
pub struct PostMeta {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    pub published_at: NaiveDate,
    #[serde(default)]
    pub updated_at: Option<NaiveDate>,
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub draft: bool,
}

/// A rendered blog post with metadata and HTML content
#[derive(Debug, Clone)]
pub struct Post {
    pub slug: String,
    pub meta: PostMeta,
    pub content_html: String,
    pub reading_time_minutes: u32,
}

/// Listing shape for a post.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary<'a> {
    pub slug: &'a str,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub author: Option<&'a str>,
    pub published_at: NaiveDate,
    pub updated_at: Option<NaiveDate>,
    pub featured_image: Option<&'a str>,
    pub category: Option<&'a str>,
    pub featured: bool,
    pub tags: &'a [String],
    pub reading_time_minutes: u32,
}

/// Full post shape, summary plus rendered body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetail<'a> {
    #[serde(flatten)]
    pub summary: PostSummary<'a>,
    pub content_html: &'a str,
}

impl Post {
    #[must_use]
    pub fn summary(&self) -> PostSummary<'_> {
        PostSummary {
            slug: &self.slug,
            title: &self.meta.title,
            description: self.meta.description.as_deref(),
            author: self.meta.author.as_deref(),
            published_at: self.meta.published_at,
            updated_at: self.meta.updated_at,
            featured_image: self.meta.featured_image.as_deref(),
            category: self.meta.category.as_deref(),
            featured: self.meta.featured,
            tags: &self.meta.tags,
            reading_time_minutes: self.reading_time_minutes,
        }
    }

    #[must_use]
    pub fn detail(&self) -> PostDetail<'_> {
        PostDetail {
            summary: self.summary(),
            content_html: &self.content_html,
        }
    }
}

/// Blog listing filters.
#[derive(Debug, Clone, Default)]
pub struct BlogQuery {
    /// Case-insensitive exact category match.
    pub category: Option<String>,
    pub featured: Option<bool>,
    pub limit: Option<usize>,
}

/// Blog store that holds all loaded posts in memory, newest first.
#[derive(Debug, Clone, Default)]
pub struct BlogStore {
    posts: Arc<Vec<Post>>,
}

impl BlogStore {
    /// Load all blog posts under `content_dir/blog`.
    ///
    /// A missing directory yields an empty store. Files that fail to parse
    /// are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the blog directory exists but cannot be read.
    pub fn load(content_dir: &Path) -> Result<Self, ContentError> {
        let dir = content_dir.join("blog");
        let mut posts = Vec::new();

        if !dir.exists() {
            tracing::info!("Blog directory does not exist yet: {:?}", dir);
            return Ok(Self::default());
        }

        let entries = std::fs::read_dir(&dir).map_err(|e| ContentError::Io(e.to_string()))?;

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "md") {
                match load_post(&path) {
                    Ok(post) => {
                        tracing::info!("Loaded post: {}", post.slug);
                        posts.push(post);
                    }
                    Err(e) => {
                        tracing::error!("Failed to load post {:?}: {}", path, e);
                    }
                }
            }
        }

        Ok(Self::from_posts(posts))
    }

    /// Build a store from already-parsed posts.
    #[must_use]
    pub fn from_posts(mut posts: Vec<Post>) -> Self {
        posts.sort_by(|a, b| {
            b.meta
                .published_at
                .cmp(&a.meta.published_at)
                .then_with(|| a.slug.cmp(&b.slug))
        });
        Self {
            posts: Arc::new(posts),
        }
    }

    /// Get a published blog post by slug. Drafts are never returned.
    #[must_use]
    pub fn get_post(&self, slug: &str) -> Option<&Post> {
        self.posts.iter().find(|p| p.slug == slug && !p.meta.draft)
    }

    /// Published posts matching the query, newest first.
    #[must_use]
    pub fn list(&self, query: &BlogQuery) -> Vec<&Post> {
        self.posts
            .iter()
            .filter(|p| !p.meta.draft)
            .filter(|p| {
                query.category.as_deref().is_none_or(|wanted| {
                    p.meta
                        .category
                        .as_deref()
                        .is_some_and(|c| c.eq_ignore_ascii_case(wanted))
                })
            })
            .filter(|p| query.featured.is_none_or(|f| p.meta.featured == f))
            .take(query.limit.unwrap_or(usize::MAX))
            .collect()
    }

    /// Number of posts loaded, drafts included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.posts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

/// Load a single blog post from a markdown file
fn load_post(path: &Path) -> Result<Post, ContentError> {
    let content = std::fs::read_to_string(path).map_err(|e| ContentError::Io(e.to_string()))?;

    let filename = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| ContentError::Parse("Invalid filename".to_string()))?;

    parse_post(strip_date_prefix(filename), &content)
}

/// Parse frontmatter and markdown into a post.
fn parse_post(slug: &str, content: &str) -> Result<Post, ContentError> {
    let matter = Matter::<YAML>::new();
    let parsed: ParsedEntity<PostMeta> = matter
        .parse(content)
        .map_err(|e| ContentError::Parse(format!("Failed to parse frontmatter: {e}")))?;
    let meta = parsed
        .data
        .ok_or_else(|| ContentError::Parse("Missing frontmatter".to_string()))?;

    let content_html = render_markdown(&parsed.content);

    // Estimate reading time (average 200 words per minute)
    let word_count = parsed.content.split_whitespace().count();
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let reading_time_minutes = ((word_count as f32) / 200.0).ceil() as u32;

    Ok(Post {
        slug: slug.to_string(),
        meta,
        content_html,
        reading_time_minutes: reading_time_minutes.max(1),
    })
}

/// Remove a leading `YYYY-MM-DD-` from a filename stem.
fn strip_date_prefix(filename: &str) -> &str {
    let has_date = filename
        .get(..10)
        .is_some_and(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").is_ok());
    match filename.get(10..) {
        Some(rest) if has_date => rest.strip_prefix('-').filter(|s| !s.is_empty()).unwrap_or(filename),
        _ => filename,
    }
}

/// Render markdown to HTML with GitHub Flavored Markdown support.
fn render_markdown(content: &str) -> String {
    let mut options = Options::default();

    // Enable GFM extensions
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options.extension.superscript = true;
    options.extension.header_ids = Some(String::new());
    options.extension.footnotes = true;

    markdown_to_html(content, &options)
}

/// Content loading errors
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
}
