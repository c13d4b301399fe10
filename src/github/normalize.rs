use serde_json::Value;

use crate::models::NormalizedRepo;

/// Reduce a raw upstream repository record to [`NormalizedRepo`].
///
/// Never fails: absent or mistyped fields become zero, `false`, empty or
/// `None`.
pub fn normalize(raw: &Value) -> NormalizedRepo {
    NormalizedRepo {
        id: u64_field(raw, "id"),
        name: str_field(raw, "name").unwrap_or_default(),
        full_name: str_field(raw, "full_name").unwrap_or_default(),
        owner_login: raw
            .get("owner")
            .and_then(|o| o.get("login"))
            .and_then(Value::as_str)
            .map(str::to_string),
        html_url: str_field(raw, "html_url").unwrap_or_default(),
        description: str_field(raw, "description"),
        stargazers_count: u64_field(raw, "stargazers_count"),
        watchers_count: u64_field(raw, "watchers_count"),
        forks_count: u64_field(raw, "forks_count"),
        open_issues_count: u64_field(raw, "open_issues_count"),
        language: str_field(raw, "language"),
        topics: raw
            .get("topics")
            .and_then(Value::as_array)
            .map(|topics| {
                topics
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        has_issues: bool_field(raw, "has_issues"),
        has_wiki: bool_field(raw, "has_wiki"),
        created_at: str_field(raw, "created_at"),
        updated_at: str_field(raw, "updated_at"),
        pushed_at: str_field(raw, "pushed_at"),
        license_name: raw
            .get("license")
            .and_then(|l| l.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string),
        default_branch: str_field(raw, "default_branch"),
    }
}

fn str_field(raw: &Value, key: &str) -> Option<String> {
    raw.get(key).and_then(Value::as_str).map(str::to_string)
}

fn u64_field(raw: &Value, key: &str) -> u64 {
    raw.get(key).and_then(Value::as_u64).unwrap_or(0)
}

fn bool_field(raw: &Value, key: &str) -> bool {
    raw.get(key).and_then(Value::as_bool).unwrap_or(false)
}
