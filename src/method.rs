//! Route methods as a typed enum.
//!
//! Only the methods a route descriptor may name are listed here. Requests
//! themselves can carry any method; a request whose method is not one of
//! these simply never matches a route and falls through to the resolver.

use std::fmt;
use std::str::FromStr;

/// A method a route can be registered for.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Method {
    Delete,
    Get,
    Head,
    Post,
    Update,
}

impl Method {
    /// Returns the uppercase wire representation (e.g. `"GET"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Delete => "DELETE",
            Self::Get    => "GET",
            Self::Head   => "HEAD",
            Self::Post   => "POST",
            Self::Update => "UPDATE",
        }
    }

    /// Case-insensitive comparison against a request's method.
    pub fn matches(self, method: &http::Method) -> bool {
        method.as_str().eq_ignore_ascii_case(self.as_str())
    }
}

/// Parses a method name, ignoring ASCII case (`"get"`, `"Get"`, `"GET"`).
impl FromStr for Method {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const ALL: [Method; 5] = [
            Method::Delete,
            Method::Get,
            Method::Head,
            Method::Post,
            Method::Update,
        ];
        ALL.into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
