use std::collections::BTreeSet;

use serde::Serialize;

use crate::source::{block_body, logical_lines, LogicalLine};

#[derive(Debug, Clone, Serialize)]
pub struct Hotspot {
    #[serde(rename = "type")]
    pub kind: String,
    pub line: usize,
    pub severity: String,
    pub suggestion: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileReport {
    pub hotspots: Vec<Hotspot>,
    pub optimization_suggestions: Vec<String>,
    pub performance_score: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn is_loop(line: &LogicalLine) -> bool {
    line.starts_with_keyword("for") || line.starts_with_keyword("while")
}

/// Index of the innermost loop enclosing `lines[idx]`.
fn enclosing_loop(lines: &[LogicalLine], idx: usize) -> Option<usize> {
    let mut threshold = lines[idx].indent;
    for j in (0..idx).rev() {
        let candidate = &lines[j];
        if candidate.indent < threshold {
            if is_loop(candidate) {
                return Some(j);
            }
            threshold = candidate.indent;
        }
    }
    None
}

/// Static performance review: nested `for` loops and `append` inside loops.
///
/// Each inner `for` under an outer `for` is one hotspot, reported at the
/// outer loop's line.
pub fn profile(code: &str) -> ProfileReport {
    let mut report = ProfileReport {
        hotspots: Vec::new(),
        optimization_suggestions: Vec::new(),
        performance_score: 100,
        error: None,
    };
    let lines = match logical_lines(code) {
        Ok(l) => l,
        Err(e) => {
            report.error = Some(e.to_string());
            return report;
        }
    };

    let mut appending_loops = BTreeSet::new();
    for (idx, line) in lines.iter().enumerate() {
        if line.code.contains(".append(") {
            if let Some(loop_idx) = enclosing_loop(&lines, idx) {
                appending_loops.insert(loop_idx);
            }
        }
        if line.starts_with_keyword("for") {
            let nested = block_body(&lines, idx)
                .iter()
                .filter(|l| l.starts_with_keyword("for"))
                .count();
            for _ in 0..nested {
                report.hotspots.push(Hotspot {
                    kind: "nested_loop".to_string(),
                    line: line.number,
                    severity: "high".to_string(),
                    suggestion: "Consider using more efficient algorithms or data structures"
                        .to_string(),
                });
            }
        }
    }
    for idx in appending_loops {
        report.optimization_suggestions.push(format!(
            "Line {}: consider using list comprehension instead of append in loops",
            lines[idx].number
        ));
    }

    let score = 100
        - 10 * report.hotspots.len() as i64
        - 5 * report.optimization_suggestions.len() as i64;
    report.performance_score = score.max(0);
    report
}
