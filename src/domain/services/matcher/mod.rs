pub mod matcher;

pub use matcher::{MatchResult, Matcher, MatcherError};
