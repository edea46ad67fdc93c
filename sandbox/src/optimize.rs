use serde::Serialize;

use crate::analysis::CodeAnalysis;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Improvement {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub severity: &'static str,
    pub message: String,
    pub line: Option<usize>,
}

/// Turn an analysis into a ranked list of improvements: overall complexity
/// first, then each issue, then each suggestion.
pub fn suggest(analysis: &CodeAnalysis) -> Vec<Improvement> {
    let mut out = Vec::new();
    if analysis.complexity > 10 {
        out.push(Improvement {
            kind: "complexity",
            severity: "high",
            message: "Code complexity is high. Consider breaking down functions into smaller units."
                .to_string(),
            line: None,
        });
    }
    out.extend(analysis.issues.iter().map(|issue| Improvement {
        kind: "code_quality",
        severity: "medium",
        message: issue.clone(),
        line: None,
    }));
    out.extend(analysis.suggestions.iter().map(|s| Improvement {
        kind: "optimization",
        severity: "low",
        message: s.clone(),
        line: None,
    }));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;

    #[test]
    fn clean_code_has_no_improvements() {
        let analysis = analyze("def f():\n    \"\"\"Doc.\"\"\"\n    return 1\n");
        assert!(suggest(&analysis).is_empty());
    }

    #[test]
    fn issues_become_medium_improvements() {
        let analysis = analyze("def f(a, b, c, d, e, g):\n    return a\n");
        let improvements = suggest(&analysis);
        assert_eq!(improvements.len(), 2);
        assert!(improvements.iter().all(|i| i.kind == "code_quality"));
        assert!(improvements[1].message.contains("too many arguments (6)"));
        let json = serde_json::to_value(&improvements[0]).unwrap();
        assert_eq!(json["type"], "code_quality");
        assert!(json["line"].is_null());
    }

    #[test]
    fn high_complexity_leads() {
        let branches: String = (0..12)
            .map(|i| format!("    if x == {}:\n        return {}\n", i, i))
            .collect();
        let code = format!("def f(x):\n    \"\"\"Doc.\"\"\"\n{}    return -1\n", branches);
        let improvements = suggest(&analyze(&code));
        assert_eq!(improvements[0].kind, "complexity");
        assert_eq!(improvements[0].severity, "high");
    }

    #[test]
    fn suggestions_are_low_severity() {
        let code = "def f(xs):\n    \"\"\"Doc.\"\"\"\n    for i in range(len(xs)):\n        print(xs[i])\n";
        let improvements = suggest(&analyze(code));
        assert_eq!(improvements.len(), 1);
        assert_eq!(improvements[0].kind, "optimization");
        assert_eq!(improvements[0].severity, "low");
    }
}
