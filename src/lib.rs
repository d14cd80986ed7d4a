#![doc = include_str!("../README.md")]

pub mod cli;
pub mod error;
pub mod logging;
pub mod tools;

pub use error::*;
pub use tools::fetch::{fetch, fetch_report, ContentFetcher, FetchOptions, FetchResult, Origin};
pub use tools::normalize::Parser;
