use std::fmt;

use crate::models::Query;

/// Deterministic cache key for a [`Query`].
///
/// Layout: `<text>[:Page:<page>][:PerPage:<perPage>]`. The separator
/// characters `%` and `:` are percent-escaped inside the text so a text
/// such as `"a:Page:1"` cannot alias `("a", page = 1)`. Texts without
/// those characters map to themselves.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn from_query(query: &Query) -> Self {
        let mut key = escape_text(&query.text);

        if let Some(page) = query.page {
            key.push_str(&format!(":Page:{page}"));
        }

        if let Some(per_page) = query.per_page {
            key.push_str(&format!(":PerPage:{per_page}"));
        }

        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&Query> for CacheKey {
    fn from(query: &Query) -> Self {
        Self::from_query(query)
    }
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '%' => out.push_str("%25"),
            ':' => out.push_str("%3A"),
            _ => out.push(c),
        }
    }
    out
}
