use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::source::logical_lines;

static DANGEROUS_CALL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^\w.])(eval|exec)\s*\(").unwrap());
static LITERAL_ASSIGN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^([A-Za-z_]\w*)\s*=\s*(?:[rRbBuU]*""|-?\d[\d_.]*|True|False|None)\s*$"#).unwrap()
});
static PERCENT_FORMAT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?:"([^"]*)"|'([^']*)')\s*%[^=]"#).unwrap());

const CREDENTIAL_HINTS: [&str; 4] = ["password", "secret", "api_key", "token"];
const SQL_VERBS: [&str; 4] = ["SELECT", "INSERT", "UPDATE", "DELETE"];

#[derive(Debug, Clone, Serialize)]
pub struct SecurityIssue {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
    pub line: usize,
    pub severity: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IntegrityReport {
    pub security_issues: Vec<SecurityIssue>,
    pub integrity_issues: Vec<String>,
    pub best_practice_violations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Flag `eval`/`exec` calls, literal credentials and `%`-built SQL.
pub fn check(code: &str) -> IntegrityReport {
    let mut report = IntegrityReport::default();
    let lines = match logical_lines(code) {
        Ok(l) => l,
        Err(e) => {
            report.error = Some(e.to_string());
            return report;
        }
    };

    for line in &lines {
        for caps in DANGEROUS_CALL_RE.captures_iter(&line.code) {
            let func = caps[1].to_string();
            report.security_issues.push(SecurityIssue {
                kind: "dangerous_function",
                message: format!("Use of {} is dangerous and should be avoided", func),
                function: Some(func),
                variable: None,
                line: line.number,
                severity: "critical",
            });
        }
    }

    for line in &lines {
        if let Some(caps) = LITERAL_ASSIGN_RE.captures(&line.code) {
            let var = caps[1].to_string();
            let lower = var.to_lowercase();
            if CREDENTIAL_HINTS.iter().any(|h| lower.contains(h)) {
                report.security_issues.push(SecurityIssue {
                    kind: "hardcoded_credential",
                    function: None,
                    variable: Some(var),
                    line: line.number,
                    severity: "high",
                    message: "Hardcoded credentials detected".to_string(),
                });
            }
        }
    }

    for line in &lines {
        let risky = PERCENT_FORMAT_RE.captures_iter(&line.raw).any(|caps| {
            let literal = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            let upper = literal.to_uppercase();
            SQL_VERBS.iter().any(|verb| upper.contains(verb))
        });
        if risky {
            report.security_issues.push(SecurityIssue {
                kind: "sql_injection_risk",
                function: None,
                variable: None,
                line: line.number,
                severity: "high",
                message: "Potential SQL injection vulnerability".to_string(),
            });
        }
    }

    report
}
