//! Query tokenizer and directive parser.
//!
//! Input is split on whitespace, then directives are pulled out of the token
//! list in a fixed order: limit, skip, year, orbit keywords, type keywords.
//! Whatever is left is free text, split into OR groups of ANDed terms. Nothing
//! is ever rejected: a token that is not a well-formed directive stays text.

use std::fmt;

use super::aliases;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OrbitKeyword {
    Leo,
    Meo,
    Geo,
}

impl OrbitKeyword {
    fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "LEO" => Some(Self::Leo),
            "MEO" => Some(Self::Meo),
            "GEO" => Some(Self::Geo),
            _ => None,
        }
    }

    /// Mean motion thresholds in revolutions per day.
    pub fn matches(&self, mean_motion: f64) -> bool {
        match self {
            Self::Leo => mean_motion > 11.25,
            Self::Geo => mean_motion > 0.98 && mean_motion < 1.02,
            Self::Meo => (1.02..=11.25).contains(&mean_motion),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeKeyword {
    Debris,
    Rocket,
}

impl TypeKeyword {
    fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "DEBRIS" => Some(Self::Debris),
            "ROCKET" | "ROCKETS" => Some(Self::Rocket),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Term {
    /// Upper-cased search text.
    pub text: String,
    pub alias: Option<&'static [&'static str]>,
}

impl Term {
    fn new(token: &str) -> Self {
        let text = token.to_uppercase();
        let alias = aliases::lookup(&text);
        Self { text, alias }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Directive {
    Limit(usize),
    Skip(usize),
    Year(i32),
    OrbitKeyword(OrbitKeyword),
    TypeKeyword(TypeKeyword),
    TextGroup(Vec<Term>),
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limit(n) => write!(f, "limit:{n}"),
            Self::Skip(n) => write!(f, "skip:{n}"),
            Self::Year(y) => write!(f, "year:{y}"),
            Self::OrbitKeyword(k) => write!(f, "{k:?}"),
            Self::TypeKeyword(k) => write!(f, "{k:?}"),
            Self::TextGroup(terms) => {
                let texts: Vec<&str> = terms.iter().map(|t| t.text.as_str()).collect();
                write!(f, "({})", texts.join(" AND "))
            }
        }
    }
}

fn parse_count(token: &str) -> Option<usize> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

fn strip_prefix_ignore_case<'a>(token: &'a str, prefix: &str) -> Option<&'a str> {
    let head = token.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &token[prefix.len()..])
}

/// Two-digit years pivot at 50; four-digit years are taken as-is.
fn parse_year(value: &str) -> Option<i32> {
    if !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let n: i32 = value.parse().ok()?;
    match value.len() {
        4 => Some(n),
        2 => Some(if n > 50 { 1900 + n } else { 2000 + n }),
        _ => None,
    }
}

/// Removes every occurrence of a `prefix:N` token or a `KEYWORD N` token
/// pair, returning the value of the first one.
fn extract_counted(tokens: &mut Vec<&str>, prefix: &str, keyword: &str) -> Option<usize> {
    let mut found = None;
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i];
        if let Some(rest) = strip_prefix_ignore_case(token, prefix) {
            if let Some(n) = parse_count(rest) {
                found = found.or(Some(n));
                tokens.remove(i);
                continue;
            }
            if rest.is_empty() {
                if let Some(n) = tokens.get(i + 1).and_then(|next| parse_count(next)) {
                    found = found.or(Some(n));
                    tokens.drain(i..i + 2);
                    continue;
                }
            }
        }
        if token.eq_ignore_ascii_case(keyword) {
            if let Some(n) = tokens.get(i + 1).and_then(|next| parse_count(next)) {
                found = found.or(Some(n));
                tokens.drain(i..i + 2);
                continue;
            }
        }
        i += 1;
    }
    found
}

fn extract_year(tokens: &mut Vec<&str>) -> Option<i32> {
    let mut found = None;
    tokens.retain(|token| {
        let value = strip_prefix_ignore_case(token, "year:").or_else(|| strip_prefix_ignore_case(token, "launch:"));
        match value.and_then(parse_year) {
            Some(year) => {
                found = found.or(Some(year));
                false
            }
            None => true,
        }
    });
    found
}

fn extract_keywords<K: PartialEq>(tokens: &mut Vec<&str>, classify: impl Fn(&str) -> Option<K>) -> Vec<K> {
    let mut found = Vec::new();
    tokens.retain(|token| match classify(*token) {
        Some(k) => {
            if !found.contains(&k) {
                found.push(k);
            }
            false
        }
        None => true,
    });
    found
}

fn text_groups(tokens: &[&str]) -> Vec<Vec<Term>> {
    tokens
        .split(|token| token.eq_ignore_ascii_case("OR"))
        .map(|group| {
            group
                .iter()
                .filter(|token| !token.eq_ignore_ascii_case("AND"))
                .map(|token| Term::new(token))
                .collect::<Vec<_>>()
        })
        .filter(|group| !group.is_empty())
        .collect()
}

/// Parses a query into directives, in extraction order.
pub fn parse(input: &str) -> Vec<Directive> {
    let mut tokens: Vec<&str> = input.split_whitespace().collect();
    let mut directives = Vec::new();

    if let Some(n) = extract_counted(&mut tokens, "limit:", "FIRST") {
        directives.push(Directive::Limit(n));
    }
    if let Some(n) = extract_counted(&mut tokens, "skip:", "SKIP") {
        directives.push(Directive::Skip(n));
    }
    if let Some(year) = extract_year(&mut tokens) {
        directives.push(Directive::Year(year));
    }
    directives.extend(extract_keywords(&mut tokens, OrbitKeyword::from_token).into_iter().map(Directive::OrbitKeyword));
    directives.extend(extract_keywords(&mut tokens, TypeKeyword::from_token).into_iter().map(Directive::TypeKeyword));
    directives.extend(text_groups(&tokens).into_iter().map(Directive::TextGroup));

    directives
}
