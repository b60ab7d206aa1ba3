//! C10 -- Suppression Engine. Removes findings matched by a config
//! `exceptions` entry or by an inline source directive, and raises a
//! diagnostic for each expired exception. Applied last, after C9 has frozen
//! the finding order.
//!
//! Inline-directive parsing is textual and line-based by design: the core
//! never reads files itself, so callers that want directive support hand in
//! a [`SourceLines`] that resolves `(filePath, line)` to text.

use std::sync::OnceLock;

use regex::Regex;

use crate::config::schema::{Config, ExceptionDef, ExceptionMatch};
use crate::facts::FactIndex;
use crate::model::Finding;

/// Supplies the text of a single source line, so the suppression engine can
/// look for `shamash:ignore` directives without doing its own I/O.
pub trait SourceLines {
    fn line(&self, file_path: &str, line: u32) -> Option<String>;
}

/// Apply exceptions and inline directives, removing suppressed findings and
/// appending one INFO diagnostic per expired exception. `sources` is
/// optional: without it, inline directives are never recognized, but
/// config-level exceptions still apply.
pub fn apply(
    findings: Vec<Finding>,
    config: &Config,
    facts: &FactIndex,
    today: chrono::NaiveDate,
    sources: Option<&dyn SourceLines>,
) -> Vec<Finding> {
    let active: Vec<&ExceptionDef> = config.exceptions.iter().filter(|e| !is_expired(e, today)).collect();

    let mut kept: Vec<Finding> = findings
        .into_iter()
        .filter(|f| {
            let by_exception = active.iter().any(|exc| exception_matches(exc, f, facts));
            let by_directive = sources.map(|s| inline_suppressed(s, f)).unwrap_or(false);
            !by_exception && !by_directive
        })
        .collect();

    for exc in &config.exceptions {
        if is_expired(exc, today) {
            kept.push(expired_diagnostic(exc));
        }
    }

    kept.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    kept.dedup();
    kept
}

fn is_expired(exc: &ExceptionDef, today: chrono::NaiveDate) -> bool {
    exc.expires_on.map(|d| d < today).unwrap_or(false)
}

fn expired_diagnostic(exc: &ExceptionDef) -> Finding {
    let mut data = std::collections::BTreeMap::new();
    data.insert("exceptionId".to_string(), exc.id.clone());
    Finding {
        rule_id: "engine.exceptionExpired".to_string(),
        message: format!("exception '{}' expired and no longer suppresses findings", exc.id),
        file_path: String::new(),
        severity: crate::config::schema::Severity::Info,
        class_fqn: None,
        member_name: None,
        line: None,
        data,
    }
}

/// Strip a role-expansion suffix (`type.name.role` -> `type.name`) so
/// exceptions written against the canonical id still match.
fn canonical_rule_id(rule_id: &str) -> String {
    let parts: Vec<&str> = rule_id.splitn(3, '.').collect();
    if parts.len() >= 2 {
        format!("{}.{}", parts[0], parts[1])
    } else {
        rule_id.to_string()
    }
}

fn exception_matches(exc: &ExceptionDef, finding: &Finding, facts: &FactIndex) -> bool {
    let canonical = canonical_rule_id(&finding.rule_id);
    let rule_ok = exc
        .suppress
        .iter()
        .any(|s| s == "*" || s == "all" || *s == canonical || *s == finding.rule_id);
    if !rule_ok {
        return false;
    }
    match_fields(&exc.matcher, finding, facts)
}

fn match_fields(matcher: &ExceptionMatch, finding: &Finding, facts: &FactIndex) -> bool {
    if let Some(re) = &matcher.class_name_regex {
        let Some(fqn) = &finding.class_fqn else { return false };
        if !full_match(re, fqn) {
            return false;
        }
    }
    if let Some(re) = &matcher.package_regex {
        let Some(fqn) = &finding.class_fqn else { return false };
        let pkg = fqn.rsplit_once('.').map(|(p, _)| p.to_string()).unwrap_or_default();
        if !full_match(re, &pkg) {
            return false;
        }
    }
    if let Some(glob) = &matcher.file_path_glob {
        if !crate::scope::glob_match(glob, &finding.file_path) {
            return false;
        }
    }
    if let Some(role_id) = &matcher.role {
        let Some(fqn) = &finding.class_fqn else { return false };
        if facts.role_assignments().class_to_role.get(fqn) != Some(role_id) {
            return false;
        }
    }
    if let Some(expected) = &matcher.member_name {
        let Some(actual) = &finding.member_name else { return false };
        if actual != expected {
            return false;
        }
    }
    true
}

fn full_match(pattern: &str, value: &str) -> bool {
    Regex::new(&format!("^(?:{pattern})$")).map(|re| re.is_match(value)).unwrap_or(false)
}

fn inline_suppressed(sources: &dyn SourceLines, finding: &Finding) -> bool {
    let Some(line) = finding.line else { return false };
    let canonical = canonical_rule_id(&finding.rule_id);
    for candidate_line in [line, line.saturating_sub(1)] {
        if candidate_line == 0 {
            continue;
        }
        let Some(text) = sources.line(&finding.file_path, candidate_line) else { continue };
        if let Some(token) = directive_token(&text) {
            if token == "all" || token == canonical || token == finding.rule_id {
                return true;
            }
        }
    }
    false
}

fn directive_token(line: &str) -> Option<String> {
    fn patterns() -> &'static [Regex; 3] {
        static PATTERNS: OnceLock<[Regex; 3]> = OnceLock::new();
        PATTERNS.get_or_init(|| {
            [
                Regex::new(r"//\s*shamash:ignore\s+([A-Za-z0-9_.*]+)").unwrap(),
                Regex::new(r#"@Suppress\(\s*"shamash:([A-Za-z0-9_.*]+)"\s*\)"#).unwrap(),
                Regex::new(r#"@SuppressWarnings\(\s*"shamash:([A-Za-z0-9_.*]+)"\s*\)"#).unwrap(),
            ]
        })
    }
    patterns().iter().find_map(|re| re.captures(line).map(|c| c[1].to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    struct FixedLines(BTreeMap<(String, u32), String>);

    impl SourceLines for FixedLines {
        fn line(&self, file_path: &str, line: u32) -> Option<String> {
            self.0.get(&(file_path.to_string(), line)).cloned()
        }
    }

    fn base_finding(rule_id: &str, line: Option<u32>) -> Finding {
        Finding {
            rule_id: rule_id.to_string(),
            message: "msg".to_string(),
            file_path: "src/Foo.java".to_string(),
            severity: crate::config::schema::Severity::Error,
            class_fqn: Some("com.example.Foo".to_string()),
            member_name: None,
            line,
            data: BTreeMap::new(),
        }
    }

    #[test]
    fn line_comment_directive_suppresses_by_canonical_id() {
        let mut lines = BTreeMap::new();
        lines.insert(("src/Foo.java".to_string(), 10), "// shamash:ignore arch.forbiddenRoleDependencies".to_string());
        let sources = FixedLines(lines);
        let finding = base_finding("arch.forbiddenRoleDependencies.controller", Some(10));
        assert!(inline_suppressed(&sources, &finding));
    }

    #[test]
    fn directive_on_line_above_also_suppresses() {
        let mut lines = BTreeMap::new();
        lines.insert(("src/Foo.java".to_string(), 9), "@Suppress(\"shamash:all\")".to_string());
        let sources = FixedLines(lines);
        let finding = base_finding("naming.bannedSuffixes", Some(10));
        assert!(inline_suppressed(&sources, &finding));
    }

    #[test]
    fn unrelated_directive_does_not_suppress() {
        let mut lines = BTreeMap::new();
        lines.insert(("src/Foo.java".to_string(), 10), "// shamash:ignore metrics.maxFanIn".to_string());
        let sources = FixedLines(lines);
        let finding = base_finding("arch.forbiddenRoleDependencies", Some(10));
        assert!(!inline_suppressed(&sources, &finding));
    }

    #[test]
    fn expired_exception_yields_info_diagnostic_and_stops_suppressing() {
        let exc = ExceptionDef {
            id: "legacy-1".to_string(),
            reason: "temporary".to_string(),
            expires_on: Some(chrono::NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()),
            matcher: ExceptionMatch {
                class_name_regex: Some(r"com\.example\.Foo".to_string()),
                package_regex: None,
                file_path_glob: None,
                role: None,
                member_name: None,
            },
            suppress: vec!["all".to_string()],
        };
        assert!(is_expired(&exc, chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()));
        let diag = expired_diagnostic(&exc);
        assert_eq!(diag.rule_id, "engine.exceptionExpired");
        assert_eq!(diag.severity, crate::config::schema::Severity::Info);
    }
}
