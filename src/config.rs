use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use url::Url;

/// Site configuration from config.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_site_title")]
    pub title: String,
    /// Base URL relative links and images are resolved against
    #[serde(default = "default_site_url")]
    pub url: String,
    #[serde(default = "default_author")]
    pub author: String,
}

/// Content security configuration from config.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Hosts (and their subdomains) whose links open in the same tab
    #[serde(default = "default_internal_domains")]
    pub internal_domains: Vec<String>,
    /// Accept non-https images served from localhost (local/dev setups)
    #[serde(default = "default_true")]
    pub allow_localhost_images: bool,
}

/// Blog behaviour configuration from config.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogConfig {
    #[serde(default = "default_data_file")]
    pub data_file: String,
    #[serde(default = "default_posts_per_page")]
    pub posts_per_page: usize,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
    #[serde(default = "default_true")]
    pub auto_approve_comments: bool,
    #[serde(default = "default_excerpt_length")]
    pub excerpt_length: usize,
}

/// Complete config.yaml structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FolioConfig {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub blog: BlogConfig,
}

impl FolioConfig {
    /// Parsed site URL, falling back to the default when the configured one is invalid
    pub fn base_url(&self) -> Url {
        match Url::parse(&self.site.url) {
            Ok(url) => url,
            Err(err) => {
                tracing::warn!(url = %self.site.url, %err, "invalid site url, using default");
                Url::parse(&default_site_url()).expect("default site url is valid")
            }
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: default_site_title(),
            url: default_site_url(),
            author: default_author(),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            internal_domains: default_internal_domains(),
            allow_localhost_images: true,
        }
    }
}

impl Default for BlogConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            posts_per_page: default_posts_per_page(),
            max_page_size: default_max_page_size(),
            auto_approve_comments: true,
            excerpt_length: default_excerpt_length(),
        }
    }
}

fn default_site_title() -> String {
    "folio".to_string()
}

fn default_site_url() -> String {
    "https://folio.example.com".to_string()
}

fn default_author() -> String {
    "Site Owner".to_string()
}

fn default_internal_domains() -> Vec<String> {
    vec!["localhost".to_string(), "folio.example.com".to_string()]
}

fn default_data_file() -> String {
    ".folio/data.json".to_string()
}

fn default_posts_per_page() -> usize {
    10
}

fn default_max_page_size() -> usize {
    100
}

fn default_excerpt_length() -> usize {
    150
}

fn default_true() -> bool {
    true
}

/// Load configuration from a YAML file; a missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<FolioConfig> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(FolioConfig::default());
    }

    let content = fs::read_to_string(path)?;
    let config: FolioConfig = serde_yaml::from_str(&content)?;

    Ok(config)
}
