//! HTTP verbs accepted in routing metadata.
//!
//! # Design Decisions
//! - Closed set of six verbs; anything else is rejected at discovery time
//! - Tokens are case-normalized to uppercase before validation
//! - `VerbSet` is a bitset so lookups on the hot path are a single AND

use std::fmt;
use std::str::FromStr;

use axum::http::Method;

use crate::routing::RouteError;

/// One of the canonical verbs a route may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
    Options,
    Patch,
}

impl Verb {
    /// All canonical verbs, in declaration order.
    pub const ALL: [Verb; 6] = [
        Verb::Get,
        Verb::Post,
        Verb::Put,
        Verb::Delete,
        Verb::Options,
        Verb::Patch,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
            Verb::Options => "OPTIONS",
            Verb::Patch => "PATCH",
        }
    }

    /// Map a request method onto a canonical verb, if it is one.
    pub fn from_method(method: &Method) -> Option<Self> {
        Self::from_str(method.as_str()).ok()
    }

    /// Comma separated list of the valid tokens, used in error messages.
    pub fn valid_tokens() -> String {
        Self::ALL
            .iter()
            .map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl FromStr for Verb {
    type Err = RouteError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Verb::Get),
            "POST" => Ok(Verb::Post),
            "PUT" => Ok(Verb::Put),
            "DELETE" => Ok(Verb::Delete),
            "OPTIONS" => Ok(Verb::Options),
            "PATCH" => Ok(Verb::Patch),
            _ => Err(RouteError::InvalidVerb {
                token: token.to_string(),
                valid: Self::valid_tokens(),
            }),
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of verbs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct VerbSet(u8);

impl VerbSet {
    pub fn empty() -> Self {
        Self(0)
    }

    /// Parse and validate a list of raw verb tokens.
    ///
    /// Fails on the first unknown token and on an empty list.
    pub fn parse<I, S>(tokens: I) -> Result<Self, RouteError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::empty();
        for token in tokens {
            set.insert(token.as_ref().parse()?);
        }
        if set.is_empty() {
            return Err(RouteError::NoVerbs);
        }
        Ok(set)
    }

    pub fn insert(&mut self, verb: Verb) {
        self.0 |= verb.bit();
    }

    pub fn contains(&self, verb: Verb) -> bool {
        self.0 & verb.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn union(self, other: VerbSet) -> VerbSet {
        VerbSet(self.0 | other.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = Verb> + '_ {
        Verb::ALL.into_iter().filter(move |v| self.contains(*v))
    }
}

impl FromIterator<Verb> for VerbSet {
    fn from_iter<T: IntoIterator<Item = Verb>>(iter: T) -> Self {
        let mut set = VerbSet::empty();
        for verb in iter {
            set.insert(verb);
        }
        set
    }
}

impl fmt::Display for VerbSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self.iter().map(Verb::as_str).collect::<Vec<_>>().join(", ");
        f.write_str(&joined)
    }
}
