use serde::Serialize;

/// Operator prefixes of the query mini-language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Owner,
    Language,
    Label,
    Stars,
    Forks,
    Updated,
    Topic,
}

/// How many times an operator may usefully appear in one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    AtMostOne,
    Many,
}

impl Operator {
    /// Ordered longest prefix first, so `@/` is tried before `@`.
    pub const ALL: [Operator; 7] = [
        Operator::Owner,
        Operator::Language,
        Operator::Label,
        Operator::Stars,
        Operator::Forks,
        Operator::Updated,
        Operator::Topic,
    ];

    pub fn prefix(&self) -> &'static str {
        match self {
            Operator::Owner => "@/",
            Operator::Language => "@",
            Operator::Label => "#",
            Operator::Stars => ">",
            Operator::Forks => "^",
            Operator::Updated => "~",
            Operator::Topic => "+",
        }
    }

    /// Upstream search qualifier the operator compiles to.
    pub fn qualifier(&self) -> &'static str {
        match self {
            Operator::Owner => "user",
            Operator::Language => "language",
            Operator::Label => "label",
            Operator::Stars => "stars",
            Operator::Forks => "forks",
            Operator::Updated => "pushed",
            Operator::Topic => "topic",
        }
    }

    pub fn cardinality(&self) -> Cardinality {
        match self {
            Operator::Label | Operator::Topic => Cardinality::Many,
            _ => Cardinality::AtMostOne,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Operator::Owner => "Only repositories owned by this user or organization",
            Operator::Language => "Primary language of the repository",
            Operator::Label => "Repositories with open issues carrying this label",
            Operator::Stars => "Minimum star count; range syntax is passed through",
            Operator::Forks => "Minimum fork count; range syntax is passed through",
            Operator::Updated => "Last push date, e.g. >2024-01-01",
            Operator::Topic => "Repository topic",
        }
    }

    pub fn example(&self) -> &'static str {
        match self {
            Operator::Owner => "@/rust-lang",
            Operator::Language => "@rust",
            Operator::Label => "#good-first-issue",
            Operator::Stars => ">1000",
            Operator::Forks => "^50..100",
            Operator::Updated => "~>2024-01-01",
            Operator::Topic => "+cli",
        }
    }

    /// Split a whitespace-free token into its operator and value.
    ///
    /// Only the longest matching prefix is considered. A bare prefix with
    /// nothing after it is not an operator.
    pub fn classify(token: &str) -> Option<(Operator, &str)> {
        let op = Operator::ALL
            .into_iter()
            .find(|op| token.starts_with(op.prefix()))?;
        let value = &token[op.prefix().len()..];
        if value.is_empty() {
            None
        } else {
            Some((op, value))
        }
    }
}

/// One row of the `/api/search-syntax` documentation.
#[derive(Debug, Clone, Serialize)]
pub struct SyntaxEntry {
    pub operator: Operator,
    pub prefix: &'static str,
    pub qualifier: &'static str,
    pub cardinality: Cardinality,
    pub description: &'static str,
    pub example: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyntaxDocs {
    pub operators: Vec<SyntaxEntry>,
    pub examples: Vec<&'static str>,
    pub notes: Vec<&'static str>,
}

pub fn syntax_docs() -> SyntaxDocs {
    SyntaxDocs {
        operators: Operator::ALL
            .into_iter()
            .map(|op| SyntaxEntry {
                operator: op,
                prefix: op.prefix(),
                qualifier: op.qualifier(),
                cardinality: op.cardinality(),
                description: op.description(),
                example: op.example(),
            })
            .collect(),
        examples: vec![
            "react @javascript #good-first-issue >1000",
            "cli @/rust-lang +terminal",
            "parser @rust ~>2024-01-01 ^>10",
        ],
        notes: vec![
            "Tokens are separated by whitespace; anything without an operator prefix is a free-text term.",
            "Single-valued operators keep their last occurrence.",
            "Only public repositories are searched.",
        ],
    }
}
