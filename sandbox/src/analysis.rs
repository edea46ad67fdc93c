use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::source::{block_body, logical_lines, LogicalLine};

static DEF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^def\s+([A-Za-z_]\w*)\s*\((.*)\)\s*(?:->\s*(.+?))?\s*:").unwrap()
});
static CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^class\s+([A-Za-z_]\w*)").unwrap());
static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^import\s+(.+)$").unwrap());
static FROM_IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^from\s+(\S+)\s+import\s+(.+)$").unwrap());
static BOOL_OP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(?:and|or)\b").unwrap());
static RANGE_LEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\brange\s*\(\s*len\s*\(").unwrap());

const BRANCH_KEYWORDS: [&str; 5] = ["if", "elif", "while", "for", "except"];
const MAX_ARGS: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct FunctionInfo {
    pub name: String,
    pub args: Vec<String>,
    pub returns: Option<String>,
    pub has_docstring: bool,
    pub complexity: u32,
    pub line: usize,
    /// Defined directly in a class body.
    #[serde(skip)]
    pub is_method: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassInfo {
    pub name: String,
    pub methods: Vec<String>,
    pub has_docstring: bool,
    pub line: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyntaxReport {
    pub error: String,
    pub line: usize,
}

/// Static summary of a Python snippet.
#[derive(Debug, Clone, Serialize)]
pub struct CodeAnalysis {
    pub functions: Vec<FunctionInfo>,
    pub classes: Vec<ClassInfo>,
    pub imports: Vec<String>,
    pub lines_of_code: usize,
    pub complexity: u32,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
    pub syntax_error: Option<SyntaxReport>,
}

fn complexity_of(body: &[LogicalLine]) -> u32 {
    let mut score = 1;
    for line in body {
        if BRANCH_KEYWORDS.iter().any(|kw| line.starts_with_keyword(kw)) {
            score += 1;
        }
        score += BOOL_OP_RE.find_iter(&line.code).count() as u32;
    }
    score
}

/// Split a parameter list on top-level commas.
fn split_params(params: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (idx, ch) in params.char_indices() {
        match ch {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            ',' if depth == 0 => {
                out.push(&params[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    out.push(&params[start..]);
    out.into_iter().map(str::trim).filter(|p| !p.is_empty()).collect()
}

/// Positional parameter names, stopping at `*`/`*args` like Python's `args.args`.
fn positional_args(params: &str) -> Vec<String> {
    let mut args = Vec::new();
    for param in split_params(params) {
        if param.starts_with('*') {
            break;
        }
        if param == "/" {
            continue;
        }
        let name = param
            .split([':', '='])
            .next()
            .unwrap_or("")
            .trim();
        if !name.is_empty() {
            args.push(name.to_string());
        }
    }
    args
}

fn has_docstring(body: &[LogicalLine]) -> bool {
    body.first().is_some_and(|l| l.is_bare_string())
}

fn parse_imports(line: &LogicalLine, imports: &mut Vec<String>) {
    if let Some(caps) = IMPORT_RE.captures(&line.code) {
        for part in caps[1].split(',') {
            let name = part.split_whitespace().next().unwrap_or("");
            if !name.is_empty() {
                imports.push(name.to_string());
            }
        }
    } else if let Some(caps) = FROM_IMPORT_RE.captures(&line.code) {
        let module = caps[1].trim_start_matches('.');
        let names = caps[2].trim_matches(|c: char| c == '(' || c == ')' || c.is_whitespace());
        for part in names.split(',') {
            let name = part.split_whitespace().next().unwrap_or("");
            if !name.is_empty() {
                imports.push(format!("{}.{}", module, name));
            }
        }
    }
}

/// Analyse `code` with indentation and pattern heuristics.
///
/// Unparseable input (unbalanced brackets, unterminated strings) yields an
/// otherwise empty report with `syntax_error` set.
pub fn analyze(code: &str) -> CodeAnalysis {
    let lines_of_code = code.split('\n').count();
    let mut analysis = CodeAnalysis {
        functions: Vec::new(),
        classes: Vec::new(),
        imports: Vec::new(),
        lines_of_code,
        complexity: 1,
        issues: Vec::new(),
        suggestions: Vec::new(),
        syntax_error: None,
    };

    let lines = match logical_lines(code) {
        Ok(lines) => lines,
        Err(e) => {
            analysis.syntax_error = Some(SyntaxReport {
                error: format!("Syntax Error: {}", e),
                line: e.line,
            });
            return analysis;
        }
    };

    let mut uses_global = false;
    let mut method_lines: Vec<usize> = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        if let Some(caps) = DEF_RE.captures(&line.code) {
            let body = block_body(&lines, idx);
            analysis.functions.push(FunctionInfo {
                name: caps[1].to_string(),
                args: positional_args(&caps[2]),
                returns: caps.get(3).map(|m| m.as_str().trim().to_string()),
                has_docstring: has_docstring(body),
                complexity: complexity_of(body),
                line: line.number,
                is_method: method_lines.contains(&line.number),
            });
        } else if let Some(caps) = CLASS_RE.captures(&line.code) {
            let body = block_body(&lines, idx);
            let member_indent = body.first().map(|l| l.indent);
            let mut methods = Vec::new();
            for member in body.iter().filter(|l| Some(l.indent) == member_indent) {
                if let Some(c) = DEF_RE.captures(&member.code) {
                    methods.push(c[1].to_string());
                    method_lines.push(member.number);
                }
            }
            analysis.classes.push(ClassInfo {
                name: caps[1].to_string(),
                methods,
                has_docstring: has_docstring(body),
                line: line.number,
            });
        } else if line.starts_with_keyword("global") {
            uses_global = true;
        } else {
            parse_imports(line, &mut analysis.imports);
        }

        if RANGE_LEN_RE.is_match(&line.code) {
            analysis.suggestions.push(format!(
                "Line {}: iterate directly or use enumerate() instead of range(len(...))",
                line.number
            ));
        }
    }

    for f in &analysis.functions {
        if !f.has_docstring {
            analysis.issues.push(format!("Missing docstring for {}", f.name));
        }
    }
    for c in &analysis.classes {
        if !c.has_docstring {
            analysis.issues.push(format!("Missing docstring for {}", c.name));
        }
    }
    for f in &analysis.functions {
        if f.args.len() > MAX_ARGS {
            analysis.issues.push(format!(
                "Function {} has too many arguments ({})",
                f.name,
                f.args.len()
            ));
        }
        if f.complexity > 10 {
            analysis.suggestions.push(format!(
                "Function {} has complexity {}; consider splitting it",
                f.name, f.complexity
            ));
        }
    }
    if uses_global {
        analysis.issues.push("Use of global variable".to_string());
    }

    let total: u32 = analysis.functions.iter().map(|f| f.complexity).sum();
    analysis.complexity = total.max(1);
    analysis
}
