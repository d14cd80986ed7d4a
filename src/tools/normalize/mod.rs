use crate::error::FetchError;
use scraper::Html;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Parser used to normalize remote HTML.
///
/// - `Fragment`: lenient body-context parse, serializes only what the input
///   contained (no `<html>`/`<body>` wrapper is added).
/// - `Document`: full document parse, always serialized with
///   `<html><head>...</head><body>...</body></html>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parser {
    #[default]
    Fragment,
    Document,
}

impl Parser {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fragment => "fragment",
            Self::Document => "document",
        }
    }
}

impl fmt::Display for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Parser {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fragment" => Ok(Self::Fragment),
            "document" => Ok(Self::Document),
            _ => Err(FetchError::UnknownParser(s.to_string())),
        }
    }
}

/// Parse `html` and return its canonical serialization.
///
/// # Examples
/// ```
/// use pagegrab::tools::normalize::{normalize, Parser};
///
/// assert_eq!(normalize("<p>hi", Parser::Fragment), "<p>hi</p>");
/// ```
pub fn normalize(html: &str, parser: Parser) -> String {
    match parser {
        Parser::Fragment => Html::parse_fragment(html).root_element().inner_html(),
        Parser::Document => Html::parse_document(html).html(),
    }
}
