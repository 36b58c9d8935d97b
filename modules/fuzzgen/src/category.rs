use std::fmt;
use std::str::FromStr;

use crate::error::FuzzgenError;

/// Wordlist flavours. Each one maps to its own list of sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Generic,
    Directories,
    Files,
    Parameters,
    Extensions,
    Subdomains,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Generic,
        Category::Directories,
        Category::Files,
        Category::Parameters,
        Category::Extensions,
        Category::Subdomains,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Generic => "generic",
            Category::Directories => "directories",
            Category::Files => "files",
            Category::Parameters => "parameters",
            Category::Extensions => "extensions",
            Category::Subdomains => "subdomains",
        }
    }

    /// File the wordlist lands in when no output path is given.
    pub fn default_output(self) -> String {
        format!("{}.txt", self.as_str())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = FuzzgenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "generic" | "g" => Ok(Category::Generic),
            "directories" | "d" => Ok(Category::Directories),
            "files" | "f" => Ok(Category::Files),
            "parameters" | "p" => Ok(Category::Parameters),
            "extensions" | "e" => Ok(Category::Extensions),
            "subdomains" | "s" => Ok(Category::Subdomains),
            _ => Err(FuzzgenError::UnknownCategory(s.to_string())),
        }
    }
}
