use std::sync::LazyLock;

use regex::{RegexSet, RegexSetBuilder};

pub const PREFIX: &str = "Mozilla/5.0 (";

static INCLUDE: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSetBuilder::new([
        r"^windows nt \d+\.\d+$",
        r"^macintosh$",
        r"^linux (x86_64|i686)$",
    ])
    .case_insensitive(true)
    .build()
    .unwrap()
});

static EXCLUDE: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSetBuilder::new([
        r"\bwindows mobile\b",
        r"\bxbox\b",
        r"\b(iphone|ipad|ipod)\b",
        r"\bandroid\b",
    ])
    .case_insensitive(true)
    .build()
    .unwrap()
});

/// Lower-cased, trimmed fields of the first parenthetical group of a user agent.
#[derive(Debug, PartialEq, Eq)]
pub struct OsDescriptor(Vec<String>);

impl OsDescriptor {
    /// `None` when the prefix is missing or the group is never closed.
    pub fn parse(ua: &str) -> Option<Self> {
        let rest = ua.strip_prefix(PREFIX)?;
        let (group, _) = rest.split_once(')')?;
        Some(Self(
            group
                .to_lowercase()
                .split(';')
                .map(|field| field.trim().to_owned())
                .collect(),
        ))
    }

    #[inline]
    pub fn fields(&self) -> &[String] {
        &self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Does not start with [`PREFIX`].
    NotBrowser,
    /// Parenthetical group is unterminated.
    Malformed,
    Excluded,
    Included,
    /// Matched neither rule list.
    Unmatched,
}

/// Ordered include/exclude rules applied per OS descriptor field.
pub struct OsFilter {
    include: RegexSet,
    exclude: RegexSet,
}

impl Default for OsFilter {
    fn default() -> Self {
        Self {
            include: INCLUDE.clone(),
            exclude: EXCLUDE.clone(),
        }
    }
}

impl OsFilter {
    pub fn new<I, E>(include: I, exclude: E) -> Result<Self, regex::Error>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        Ok(Self {
            include: RegexSetBuilder::new(include).case_insensitive(true).build()?,
            exclude: RegexSetBuilder::new(exclude).case_insensitive(true).build()?,
        })
    }

    /// Expects an already trimmed candidate.
    pub fn judge(&self, ua: &str) -> Verdict {
        if !ua.starts_with(PREFIX) {
            return Verdict::NotBrowser;
        }
        let Some(os) = OsDescriptor::parse(ua) else {
            return Verdict::Malformed;
        };
        if os.fields().iter().any(|f| self.exclude.is_match(f)) {
            Verdict::Excluded
        } else if os.fields().iter().any(|f| self.include.is_match(f)) {
            Verdict::Included
        } else {
            Verdict::Unmatched
        }
    }
}
