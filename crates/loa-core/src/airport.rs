//! Airport code matching against exact-set / prefix-list filters.

use std::collections::HashSet;

/// Pre-indexed airport filter for one rule entry side (origin or destination).
///
/// Built once at load time from the raw code list: 4-character codes go into
/// the exact set, shorter codes are treated as literal prefixes. The two
/// structures are a lossless partition of the raw list, so an empty filter
/// means the raw list was empty; the "no constraint" policy lives in the
/// caller, not here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AirportFilter {
    exact: HashSet<String>,
    prefixes: Vec<String>,
}

impl AirportFilter {
    pub fn from_codes<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut filter = Self::default();
        for code in codes {
            let code = code.into();
            if code.len() == 4 {
                filter.exact.insert(code);
            } else {
                filter.prefixes.push(code);
            }
        }
        filter
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.prefixes.is_empty()
    }

    /// True iff `code` is in the exact set, or starts with any listed prefix.
    /// Codes are assumed upper-case already; no normalization is applied.
    pub fn matches(&self, code: &str) -> bool {
        if self.exact.contains(code) {
            return true;
        }
        self.prefixes.iter().any(|prefix| code.starts_with(prefix))
    }
}
