use anyhow::{Context, Result};
use clap::{Args, Parser as ClapParser, Subcommand};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use folio::analyzer::analyze;
use folio::blog::{BlogService, NewPost, PostUpdate};
use folio::comments::NewComment;
use folio::config::{load_config, FolioConfig};
use folio::query::{ListQuery, SortField, SortOrder, TagSort};
use folio::sanitizer::{validate_content, Sanitizer};
use folio::share::{format_relative, share_links};
use folio::store::JsonStore;
use folio::toc::build_toc;
use folio::types::Tag;

#[derive(ClapParser)]
#[command(name = "folio")]
#[command(about = "Blog content pipeline: posts, comments, sanitization and listings")]
#[command(version)]
struct Cli {
    /// Path to config.yaml
    #[arg(short, long, default_value = "config.yaml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List posts
    List {
        #[command(flatten)]
        query: QueryArgs,

        /// Include unpublished drafts
        #[arg(long)]
        drafts: bool,
    },

    /// Show a published post (counts a view)
    Show { slug: String },

    /// Create a post from a markdown file
    New {
        #[arg(long)]
        title: String,

        #[arg(long)]
        description: String,

        /// Markdown body file ("-" for stdin)
        #[arg(long)]
        content: PathBuf,

        /// Comma-separated tags
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,

        #[arg(long)]
        banner_image: Option<String>,

        #[arg(long)]
        published: bool,
    },

    /// Update fields of a post
    Update {
        slug: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Markdown body file ("-" for stdin)
        #[arg(long)]
        content: Option<PathBuf>,

        /// Comma-separated tags, replacing the current ones
        #[arg(long, value_delimiter = ',')]
        tags: Option<Vec<String>>,

        #[arg(long)]
        banner_image: Option<String>,

        #[arg(long)]
        published: Option<bool>,
    },

    /// Delete a post with its comments and likes
    Delete { slug: String },

    /// Toggle a reader's like on a post
    Like {
        slug: String,

        #[arg(long)]
        reader: String,
    },

    /// Add a comment to a post
    Comment {
        slug: String,

        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        content: String,

        /// Id of the comment being replied to
        #[arg(long)]
        parent: Option<String>,
    },

    /// Show the approved comment thread of a post
    Comments { slug: String },

    /// List tags with post counts
    Tags {
        #[arg(long, value_enum, default_value_t = TagSort::Count)]
        sort_by: TagSort,

        #[arg(long, value_enum, default_value_t = SortOrder::Desc)]
        order: SortOrder,
    },

    /// Import markdown files with YAML frontmatter
    Import { dir: PathBuf },

    /// Sanitize HTML from a file or stdin
    Sanitize {
        file: Option<PathBuf>,

        /// Use the reduced comment allow-list
        #[arg(long)]
        user: bool,
    },

    /// Word count, reading time and element counts of HTML
    Analyze { file: Option<PathBuf> },

    /// Table of contents of markdown content
    Toc { file: Option<PathBuf> },

    /// Check content before saving
    Validate { file: Option<PathBuf> },

    /// Share links for a post
    Share { slug: String },
}

#[derive(Args)]
struct QueryArgs {
    /// Search title, description, tags and content
    #[arg(short, long)]
    search: Option<String>,

    #[arg(short, long)]
    tag: Option<String>,

    #[arg(long, value_enum, default_value_t = SortField::CreatedAt)]
    sort_by: SortField,

    #[arg(long, value_enum, default_value_t = SortOrder::Desc)]
    order: SortOrder,

    #[arg(short, long, default_value_t = 1, allow_negative_numbers = true)]
    page: i64,

    /// Defaults to blog.posts_per_page
    #[arg(long, allow_negative_numbers = true)]
    page_size: Option<i64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;

    match cli.command {
        Commands::List { query, drafts } => {
            let blog = open_blog(&config)?;
            let query = ListQuery {
                search: query.search,
                tag: query.tag,
                sort_by: query.sort_by,
                sort_order: query.order,
                page: query.page,
                page_size: query
                    .page_size
                    .unwrap_or_else(|| i64::try_from(config.blog.posts_per_page).unwrap_or(10)),
            };
            print_json(&blog.list_posts(&query, drafts)?)?;
        }
        Commands::Show { slug } => {
            let mut blog = open_blog(&config)?;
            let rendered = blog.view_post(&slug)?;
            save(&blog)?;
            print_json(&rendered)?;
        }
        Commands::New {
            title,
            description,
            content,
            tags,
            banner_image,
            published,
        } => {
            let mut blog = open_blog(&config)?;
            let post = blog.create_post(NewPost {
                title,
                description,
                content: read_input(Some(content.as_path()))?,
                tags: tags.into_iter().map(Tag::Name).collect(),
                banner_image,
                published,
            })?;
            save(&blog)?;
            println!("✅ Created: {}", post.slug);
            println!("   Read time: {} min", post.read_time);
        }
        Commands::Update {
            slug,
            title,
            description,
            content,
            tags,
            banner_image,
            published,
        } => {
            let mut blog = open_blog(&config)?;
            let content = content.map(|path| read_input(Some(path.as_path()))).transpose()?;
            let post = blog.update_post(
                &slug,
                PostUpdate {
                    title,
                    description,
                    content,
                    tags: tags.map(|tags| tags.into_iter().map(Tag::Name).collect()),
                    banner_image,
                    published,
                },
            )?;
            save(&blog)?;
            println!("✅ Updated: {}", post.slug);
        }
        Commands::Delete { slug } => {
            let mut blog = open_blog(&config)?;
            let post = blog.delete_post(&slug)?;
            save(&blog)?;
            println!("🗑  Deleted: {}", post.slug);
        }
        Commands::Like { slug, reader } => {
            let mut blog = open_blog(&config)?;
            let status = blog.toggle_like(&slug, &reader)?;
            save(&blog)?;
            print_json(&status)?;
        }
        Commands::Comment {
            slug,
            name,
            email,
            content,
            parent,
        } => {
            let mut blog = open_blog(&config)?;
            let comment = blog.add_comment(
                &slug,
                NewComment {
                    name,
                    email,
                    content,
                    parent_id: parent,
                },
            )?;
            save(&blog)?;
            print_json(&comment)?;
        }
        Commands::Comments { slug } => {
            let blog = open_blog(&config)?;
            print_json(&blog.list_comments(&slug)?)?;
        }
        Commands::Tags { sort_by, order } => {
            let blog = open_blog(&config)?;
            print_json(&blog.tags(sort_by, order)?)?;
        }
        Commands::Import { dir } => {
            let mut blog = open_blog(&config)?;
            let report = blog.import_markdown(&dir)?;
            save(&blog)?;

            for slug in &report.imported {
                println!("📄 Imported: {}", slug);
            }
            for path in &report.skipped {
                println!("⏭  Skipped: {}", path);
            }
            println!("\n✅ Import complete!");
            println!("   Imported: {}", report.imported.len());
            println!("   Skipped: {}", report.skipped.len());
        }
        Commands::Sanitize { file, user } => {
            let raw = read_input(file.as_deref())?;
            let sanitizer = Sanitizer::from_config(&config);
            let clean = if user {
                sanitizer.sanitize_user_input(&raw)
            } else {
                sanitizer.sanitize(&raw)
            };
            println!("{}", clean);
        }
        Commands::Analyze { file } => {
            let raw = read_input(file.as_deref())?;
            let clean = Sanitizer::from_config(&config).sanitize(&raw);
            print_json(&analyze(&clean))?;
        }
        Commands::Toc { file } => {
            print_json(&build_toc(&read_input(file.as_deref())?))?;
        }
        Commands::Validate { file } => {
            let result = validate_content(&read_input(file.as_deref())?);
            print_json(&result)?;
            if !result.is_valid {
                std::process::exit(1);
            }
        }
        Commands::Share { slug } => {
            let blog = open_blog(&config)?;
            let post = blog.get_post(&slug)?;
            let url = config
                .base_url()
                .join(&format!("blog/{}", post.slug))
                .context("Failed to build post url")?;

            print_json(&serde_json::json!({
                "links": share_links(&post.title, &post.description, url.as_str()),
                "published": format_relative(post.created_at, chrono::Utc::now()),
            }))?;
        }
    }

    Ok(())
}

fn open_blog(config: &FolioConfig) -> Result<BlogService<JsonStore>> {
    let store = JsonStore::open(&config.blog.data_file)
        .with_context(|| format!("Failed to open data file {}", config.blog.data_file))?;
    Ok(BlogService::new(store, config))
}

fn save(blog: &BlogService<JsonStore>) -> Result<()> {
    blog.repository().save().context("Failed to save data file")
}

/// Read a file, or stdin when no path (or "-") is given
fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) if path != Path::new("-") => fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        _ => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
