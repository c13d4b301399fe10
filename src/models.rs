use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::query::compiler::ParsedOperators;

/// Languages accepted by the `language` request parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    JavaScript,
    TypeScript,
    Python,
    Java,
    Go,
    Rust,
    C,
    Cpp,
    CSharp,
    Ruby,
    Php,
    Swift,
    Kotlin,
    Scala,
    Shell,
    Html,
    Css,
    Dart,
    Elixir,
    Haskell,
}

impl Language {
    pub const ALL: [Language; 20] = [
        Language::JavaScript,
        Language::TypeScript,
        Language::Python,
        Language::Java,
        Language::Go,
        Language::Rust,
        Language::C,
        Language::Cpp,
        Language::CSharp,
        Language::Ruby,
        Language::Php,
        Language::Swift,
        Language::Kotlin,
        Language::Scala,
        Language::Shell,
        Language::Html,
        Language::Css,
        Language::Dart,
        Language::Elixir,
        Language::Haskell,
    ];

    /// Qualifier value understood by the upstream `language:` filter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Python => "python",
            Language::Java => "java",
            Language::Go => "go",
            Language::Rust => "rust",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::CSharp => "csharp",
            Language::Ruby => "ruby",
            Language::Php => "php",
            Language::Swift => "swift",
            Language::Kotlin => "kotlin",
            Language::Scala => "scala",
            Language::Shell => "shell",
            Language::Html => "html",
            Language::Css => "css",
            Language::Dart => "dart",
            Language::Elixir => "elixir",
            Language::Haskell => "haskell",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Language::ALL
            .into_iter()
            .find(|l| l.as_str() == lower)
            .ok_or(())
    }
}

/// Sort orders supported by the upstream repository search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOption {
    #[default]
    Stars,
    Forks,
    Updated,
    HelpWantedIssues,
}

impl SortOption {
    pub const ALL: [SortOption; 4] = [
        SortOption::Stars,
        SortOption::Forks,
        SortOption::Updated,
        SortOption::HelpWantedIssues,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOption::Stars => "stars",
            SortOption::Forks => "forks",
            SortOption::Updated => "updated",
            SortOption::HelpWantedIssues => "help-wanted-issues",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortOption::Stars => "Most stars",
            SortOption::Forks => "Most forks",
            SortOption::Updated => "Recently updated",
            SortOption::HelpWantedIssues => "Most help-wanted issues",
        }
    }
}

impl fmt::Display for SortOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOption {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortOption::ALL
            .into_iter()
            .find(|o| o.as_str() == s.trim())
            .ok_or(())
    }
}

/// A repository reduced to the fields every consumer relies on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRepo {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub owner_login: Option<String>,
    pub html_url: String,
    pub description: Option<String>,
    pub stargazers_count: u64,
    pub watchers_count: u64,
    pub forks_count: u64,
    pub open_issues_count: u64,
    pub language: Option<String>,
    pub topics: Vec<String>,
    pub has_issues: bool,
    pub has_wiki: bool,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub pushed_at: Option<String>,
    pub license_name: Option<String>,
    pub default_branch: Option<String>,
}

/// What gets cached: the normalized page of results for one search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub total_count: u64,
    pub items: Vec<NormalizedRepo>,
}

/// Upstream quota counters read from response headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitInfo {
    pub remaining: Option<u32>,
    pub reset: Option<DateTime<Utc>>,
}

/// Echo of how the raw query was interpreted.
#[derive(Debug, Clone, Serialize)]
pub struct QueryInfo {
    pub original_query: String,
    pub compiled_query: String,
    pub sort: SortOption,
    pub parsed_operators: ParsedOperators,
}

/// Raw `/api/search` query parameters. Everything stays a string so that
/// malformed values surface as our own validation errors.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchRequest {
    pub q: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
    pub language: Option<String>,
    /// Comma-separated label names
    pub labels: Option<String>,
    pub sort: Option<String>,
}

/// Search response
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub total_count: u64,
    pub items: Vec<NormalizedRepo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_info: Option<QueryInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimitInfo>,
    pub cached: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LanguagesResponse {
    pub languages: Vec<Language>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SortOptionEntry {
    pub value: SortOption,
    pub label: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct SortOptionsResponse {
    pub sort_options: Vec<SortOptionEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub keys: usize,
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub cache: CacheStats,
    /// Seconds since the process started serving
    pub uptime: u64,
    pub in_flight: usize,
}
