//! Compiles the operator mini-language into upstream search syntax.
//!
//! ```text
//! react @javascript #good-first-issue >1000
//!   └─► react language:javascript label:"good-first-issue" stars:1000+is:public
//! ```
//!
//! Compilation is pure and total: any token that is not a recognised
//! operator is kept as a free-text term, in its original position relative
//! to the other free-text terms.

use serde::Serialize;

use crate::models::{Language, SortOption};
use crate::query::operators::Operator;

/// Appended verbatim to every compiled query.
pub const VISIBILITY_SUFFIX: &str = "+is:public";

/// Every token of a raw query, sorted into the field it selects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedOperators {
    pub language: Option<String>,
    pub labels: Vec<String>,
    pub stars: Option<String>,
    pub forks: Option<String>,
    pub updated: Option<String>,
    pub owner: Option<String>,
    pub topics: Vec<String>,
    pub base_query: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledQuery {
    pub query_string: String,
    pub sort: SortOption,
    pub parsed_operators: ParsedOperators,
}

impl ParsedOperators {
    pub fn parse(raw: &str) -> Self {
        let mut parsed = Self::default();

        for token in raw.split_whitespace() {
            let Some((op, value)) = Operator::classify(token) else {
                parsed.base_query.push(token.to_string());
                continue;
            };
            let value = value.to_string();
            match op {
                Operator::Owner => parsed.owner = Some(value),
                Operator::Language => parsed.language = Some(value),
                Operator::Stars => parsed.stars = Some(value),
                Operator::Forks => parsed.forks = Some(value),
                Operator::Updated => parsed.updated = Some(value),
                Operator::Topic => parsed.topics.push(value),
                Operator::Label => match clean_label(&value) {
                    Some(label) => parsed.labels.push(label),
                    None => parsed.base_query.push(token.to_string()),
                },
            }
        }

        parsed
    }

    /// Add labels that arrived outside the query text, after any `#` labels.
    pub fn extend_labels<'a>(&mut self, labels: impl IntoIterator<Item = &'a str>) {
        self.labels.extend(labels.into_iter().filter_map(clean_label));
    }

    /// Upstream query string: free text, then one clause per populated
    /// field in a fixed order, then the visibility suffix.
    pub fn to_query_string(&self) -> String {
        let mut parts: Vec<String> = self.base_query.clone();

        if let Some(language) = &self.language {
            parts.push(clause(Operator::Language, language));
        }
        for label in &self.labels {
            parts.push(format!("{}:\"{label}\"", Operator::Label.qualifier()));
        }
        if let Some(stars) = &self.stars {
            parts.push(clause(Operator::Stars, stars));
        }
        if let Some(forks) = &self.forks {
            parts.push(clause(Operator::Forks, forks));
        }
        if let Some(updated) = &self.updated {
            parts.push(clause(Operator::Updated, updated));
        }
        if let Some(owner) = &self.owner {
            parts.push(clause(Operator::Owner, owner));
        }
        for topic in &self.topics {
            parts.push(clause(Operator::Topic, topic));
        }

        let mut query = parts.join(" ");
        query.push_str(VISIBILITY_SUFFIX);
        query
    }
}

fn clause(op: Operator, value: &str) -> String {
    format!("{}:{value}", op.qualifier())
}

/// Labels are quoted upstream, so embedded quotes are dropped.
fn clean_label(raw: &str) -> Option<String> {
    let label: String = raw.trim().chars().filter(|c| *c != '"').collect();
    let label = label.trim();
    if label.is_empty() {
        None
    } else {
        Some(label.to_string())
    }
}

/// Compile a raw query for the given sort order.
pub fn compile(raw: &str, sort: SortOption) -> CompiledQuery {
    compile_parsed(ParsedOperators::parse(raw), sort)
}

/// Compile a raw query together with filters passed as separate request
/// parameters. An `@language` operator in the text takes precedence over
/// the `language` parameter.
pub fn compile_with_filters(
    raw: &str,
    sort: SortOption,
    language: Option<Language>,
    labels: &[String],
) -> CompiledQuery {
    let mut parsed = ParsedOperators::parse(raw);
    if parsed.language.is_none() {
        parsed.language = language.map(|l| l.as_str().to_string());
    }
    parsed.extend_labels(labels.iter().map(String::as_str));
    compile_parsed(parsed, sort)
}

fn compile_parsed(parsed: ParsedOperators, sort: SortOption) -> CompiledQuery {
    CompiledQuery {
        query_string: parsed.to_query_string(),
        sort,
        parsed_operators: parsed,
    }
}
