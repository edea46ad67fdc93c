//! Line-level view of Python source used by the heuristic analysers.

/// A statement after joining bracket and backslash continuations.
#[derive(Debug, Clone)]
pub(crate) struct LogicalLine {
    /// 1-based line of the first physical line.
    pub number: usize,
    pub indent: usize,
    /// Source with comments dropped and every string literal collapsed to `""`.
    pub code: String,
    /// Source with comments dropped, string contents kept.
    pub raw: String,
}

impl LogicalLine {
    /// True when the statement starts with keyword `kw` (`async` prefixes ignored).
    pub fn starts_with_keyword(&self, kw: &str) -> bool {
        let code = self.code.strip_prefix("async ").unwrap_or(&self.code).trim_start();
        match code.strip_prefix(kw) {
            Some(rest) => !rest.starts_with(|c: char| c.is_alphanumeric() || c == '_'),
            None => false,
        }
    }

    /// True when the statement is nothing but a string literal (a docstring
    /// candidate).
    pub fn is_bare_string(&self) -> bool {
        let code = self.code.trim_start_matches(|c: char| "rRuUbBfF".contains(c));
        code == "\"\""
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    pub message: String,
    pub line: usize,
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (line {})", self.message, self.line)
    }
}

#[derive(Default)]
struct Pending {
    start: Option<usize>,
    indent: usize,
    code: String,
    raw: String,
}

impl Pending {
    fn finish(&mut self, out: &mut Vec<LogicalLine>) {
        let pending = std::mem::take(self);
        if let Some(number) = pending.start {
            let code = pending.code.trim().to_string();
            if !code.is_empty() {
                out.push(LogicalLine {
                    number,
                    indent: pending.indent,
                    code,
                    raw: pending.raw.trim().to_string(),
                });
            }
        }
    }
}

fn closing(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

/// Split `src` into logical lines. Fails on unbalanced brackets and
/// unterminated string literals.
pub(crate) fn logical_lines(src: &str) -> Result<Vec<LogicalLine>, SourceError> {
    let src = src.replace("\r\n", "\n");
    let chars: Vec<char> = src.chars().collect();
    let mut out = Vec::new();
    let mut cur = Pending::default();
    let mut stack: Vec<(char, usize)> = Vec::new();
    let mut line = 1;
    let mut at_line_start = true;
    let mut indent = 0;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if at_line_start {
            match c {
                ' ' => {
                    indent += 1;
                    i += 1;
                    continue;
                }
                '\t' => {
                    indent += 8 - indent % 8;
                    i += 1;
                    continue;
                }
                _ => {}
            }
            at_line_start = false;
            if cur.start.is_none() {
                if c == '\n' {
                    line += 1;
                    at_line_start = true;
                    indent = 0;
                    i += 1;
                    continue;
                }
                if c != '#' {
                    cur.start = Some(line);
                    cur.indent = indent;
                }
            }
        }

        match c {
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
                continue;
            }
            '"' | '\'' => {
                let triple = i + 2 < chars.len() && chars[i + 1] == c && chars[i + 2] == c;
                let quote_len = if triple { 3 } else { 1 };
                let opened_at = line;
                let mut j = i + quote_len;
                let mut closed = false;
                while j < chars.len() {
                    let ch = chars[j];
                    if ch == '\\' {
                        if chars.get(j + 1) == Some(&'\n') {
                            line += 1;
                        }
                        j += 2;
                        continue;
                    }
                    if ch == '\n' {
                        if !triple {
                            break;
                        }
                        line += 1;
                    }
                    if ch == c
                        && (!triple
                            || (j + 2 < chars.len() && chars[j + 1] == c && chars[j + 2] == c))
                    {
                        closed = true;
                        j += quote_len;
                        break;
                    }
                    j += 1;
                }
                if !closed {
                    return Err(SourceError {
                        message: "unterminated string literal".to_string(),
                        line: opened_at,
                    });
                }
                cur.raw.extend(&chars[i..j]);
                cur.code.push_str("\"\"");
                i = j;
                continue;
            }
            '(' | '[' | '{' => stack.push((c, line)),
            ')' | ']' | '}' => match stack.pop() {
                Some((open, _)) if closing(open) == c => {}
                _ => {
                    return Err(SourceError {
                        message: format!("unmatched '{}'", c),
                        line,
                    })
                }
            },
            '\\' if chars.get(i + 1) == Some(&'\n') => {
                cur.code.push(' ');
                cur.raw.push(' ');
                line += 1;
                i += 2;
                continue;
            }
            '\n' => {
                line += 1;
                if stack.is_empty() {
                    cur.finish(&mut out);
                    at_line_start = true;
                    indent = 0;
                } else {
                    cur.code.push(' ');
                    cur.raw.push(' ');
                }
                i += 1;
                continue;
            }
            _ => {}
        }

        cur.code.push(c);
        cur.raw.push(c);
        i += 1;
    }

    if let Some((open, opened_at)) = stack.first() {
        return Err(SourceError {
            message: format!("'{}' was never closed", open),
            line: *opened_at,
        });
    }
    cur.finish(&mut out);
    Ok(out)
}

/// The statements nested under `lines[idx]` (deeper indentation, contiguous).
pub(crate) fn block_body(lines: &[LogicalLine], idx: usize) -> &[LogicalLine] {
    let indent = lines[idx].indent;
    let rest = &lines[idx + 1..];
    let end = rest
        .iter()
        .position(|l| l.indent <= indent)
        .unwrap_or(rest.len());
    &rest[..end]
}
