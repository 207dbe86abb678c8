use regex::{Regex, RegexBuilder};

use crate::error::PatternError;

/// Upper bound on the compiled program size of a user query.
const PATTERN_SIZE_LIMIT: usize = 4 * (1 << 20);

/// A query compiled once and reused across files.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    regex: Regex,
}

impl CompiledPattern {
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        self.regex.is_match(haystack)
    }
}

/// Compile a search query.
///
/// Literal queries are escaped, and only literal queries get word-boundary
/// anchors for `whole_word`; a regex query is taken as written. An empty
/// query means no search and yields `Ok(None)`.
pub fn compile_pattern(
    query: &str,
    case_sensitive: bool,
    whole_word: bool,
    use_regex: bool,
) -> Result<Option<CompiledPattern>, PatternError> {
    if query.is_empty() {
        return Ok(None);
    }

    let source = if use_regex {
        query.to_string()
    } else if whole_word {
        format!(r"\b(?:{})\b", regex::escape(query))
    } else {
        regex::escape(query)
    };

    let regex = RegexBuilder::new(&source)
        .case_insensitive(!case_sensitive)
        .size_limit(PATTERN_SIZE_LIMIT)
        .build()?;

    Ok(Some(CompiledPattern { regex }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(query: &str, cs: bool, ww: bool, re: bool) -> CompiledPattern {
        compile_pattern(query, cs, ww, re).unwrap().unwrap()
    }

    #[test]
    fn empty_query_is_no_search() {
        assert!(compile_pattern("", false, true, true).unwrap().is_none());
    }

    #[test]
    fn literal_queries_escape_metacharacters() {
        let p = compile("a.b(c)", true, false, false);
        assert_eq!(p.as_str(), r"a\.b\(c\)");
        assert!(p.is_match("x a.b(c) y"));
        assert!(!p.is_match("axb(c)"));
    }

    #[test]
    fn case_sensitivity() {
        assert!(compile("todo", false, false, false).is_match("TODO"));
        assert!(!compile("todo", true, false, false).is_match("TODO"));
    }

    #[test]
    fn whole_word_applies_to_literals_only() {
        let p = compile("log", true, true, false);
        assert!(p.is_match("console.log(x)"));
        assert!(!p.is_match("dialog"));

        let p = compile("log", true, true, true);
        assert!(p.is_match("dialog"));
    }

    #[test]
    fn malformed_regex_is_an_error() {
        let err = compile_pattern("(unclosed", false, false, true).unwrap_err();
        assert!(err.to_string().starts_with("invalid pattern"));

        // The same text is fine as a literal.
        assert!(compile_pattern("(unclosed", false, false, false).is_ok());
    }
}
