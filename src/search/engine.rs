use serde::Serialize;

use super::CompiledPattern;

/// A single match, positioned by line and column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMatch {
    pub file_path: String,
    /// 1-indexed.
    pub line_number: u32,
    /// 1-indexed, counted in characters.
    pub column_number: u32,
    /// Byte range of the match within `line_content`, clipped at the line end
    /// for matches that span lines.
    pub match_start: usize,
    pub match_end: usize,
    pub line_content: String,
    pub context_before: Vec<String>,
    pub context_after: Vec<String>,
}

/// All matches in one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSearchResult {
    pub file_path: String,
    /// Total matches in the file, including any beyond a per-file cap.
    pub match_count: u32,
    pub matches: Vec<SearchMatch>,
}

/// Byte offsets where each line of a text starts.
///
/// Offsets refer to the original string, so match positions from the regex
/// engine can be looked up directly. Line `i` spans from `starts[i]` up to
/// the `\n` that ends it (exclusive).
pub struct LineIndex<'a> {
    content: &'a str,
    starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(content: &'a str) -> Self {
        let mut starts = vec![0];
        starts.extend(content.match_indices('\n').map(|(i, _)| i + 1));
        Self { content, starts }
    }

    pub fn line_count(&self) -> usize {
        self.starts.len()
    }

    /// 0-based line containing byte `offset`.
    pub fn line_of(&self, offset: usize) -> usize {
        self.starts.partition_point(|&start| start <= offset) - 1
    }

    pub fn line_start(&self, line: usize) -> usize {
        self.starts[line]
    }

    /// Text of a line without its terminator (`\n` or `\r\n`).
    pub fn line(&self, line: usize) -> &'a str {
        let start = self.starts[line];
        let end = match self.starts.get(line + 1) {
            Some(next) => next - 1,
            None => self.content.len(),
        };
        let text = &self.content[start..end];
        text.strip_suffix('\r').unwrap_or(text)
    }
}

/// Find every match of `pattern` in `content`, in document order.
///
/// Matching runs over the whole text, not per line, so a regex may span
/// lines; such a match is reported on the line where it starts. Empty
/// matches are skipped.
pub fn search(
    file_path: &str,
    content: &str,
    pattern: &CompiledPattern,
    context_lines: u32,
) -> Vec<SearchMatch> {
    let index = LineIndex::new(content);
    let context = context_lines as usize;
    let last_line = index.line_count() - 1;

    pattern
        .regex()
        .find_iter(content)
        .filter(|m| !m.is_empty())
        .map(|m| {
            let line = index.line_of(m.start());
            let line_start = index.line_start(line);
            let line_content = index.line(line);

            let column = content[line_start..m.start()].chars().count() + 1;
            let match_start = (m.start() - line_start).min(line_content.len());
            let match_end = (m.end() - line_start).min(line_content.len());

            let before = line.saturating_sub(context)..line;
            let after = (line + 1)..=(line + context).min(last_line);

            SearchMatch {
                file_path: file_path.to_string(),
                line_number: (line + 1) as u32,
                column_number: column as u32,
                match_start,
                match_end,
                line_content: line_content.to_string(),
                context_before: before.map(|i| index.line(i).to_string()).collect(),
                context_after: after.map(|i| index.line(i).to_string()).collect(),
            }
        })
        .collect()
}

/// Search several files, keeping one result per file that matched.
///
/// Results follow the input order. `max_matches_per_file` caps the stored
/// matches but not `match_count`.
pub fn search_files<I, P, C>(
    files: I,
    pattern: &CompiledPattern,
    context_lines: u32,
    max_matches_per_file: Option<usize>,
) -> Vec<FileSearchResult>
where
    I: IntoIterator<Item = (P, C)>,
    P: AsRef<str>,
    C: AsRef<str>,
{
    files
        .into_iter()
        .filter_map(|(path, content)| {
            let mut matches = search(path.as_ref(), content.as_ref(), pattern, context_lines);
            if matches.is_empty() {
                return None;
            }
            let match_count = matches.len() as u32;
            if let Some(max) = max_matches_per_file {
                matches.truncate(max);
            }
            Some(FileSearchResult {
                file_path: path.as_ref().to_string(),
                match_count,
                matches,
            })
        })
        .collect()
}
