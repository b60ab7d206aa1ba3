use std::path::Path;

use crate::cancel::CancellationToken;
use crate::error::Result;
use crate::extract::BytecodeUnit;
use crate::model::{OriginKind, SourceLocation};
use crate::rules::RuleRegistry;

pub fn run(project: &Path, config_override: Option<&Path>, json: bool) -> Result<()> {
    let config_path = super::locate_config(project, config_override)?;
    let config = super::load_config(&config_path)?;

    let registry = RuleRegistry::default();
    let issues = crate::config::validate(&config, &registry);
    if issues.iter().any(|i| i.level == crate::error::IssueLevel::Error) {
        return Err(crate::error::ShamashError::ValidationFailed { errors: issues });
    }

    let roots = if config.project.bytecode_roots.is_empty() {
        vec![project.to_path_buf()]
    } else {
        config.project.bytecode_roots.iter().map(|r| project.join(r)).collect()
    };
    let units: Vec<BytecodeUnit> = roots.iter().flat_map(|root| collect_units(root)).collect();
    tracing::info!(unit_count = units.len(), "collected bytecode units");

    let token = CancellationToken::new();
    let today = chrono::Local::now().date_naive();
    let outcome = crate::pipeline::run_scan(&units, &config, &registry, &token, today, None)?;

    if !outcome.facts.errors.is_empty() {
        for error in &outcome.facts.errors {
            tracing::warn!(origin = %error.origin_id, phase = %error.phase, "{}", error.message);
        }
    }

    if json {
        print_json(&outcome.findings)?;
    } else {
        print_text(&outcome.findings);
    }
    Ok(())
}

fn print_text(findings: &[crate::model::Finding]) {
    for finding in findings {
        println!(
            "{} [{}] {}:{} {}",
            finding.rule_id,
            finding.severity.as_wire_str(),
            finding.file_path,
            finding.class_fqn.as_deref().unwrap_or("-"),
            finding.message,
        );
    }
    println!("{} finding(s)", findings.len());
}

fn print_json(findings: &[crate::model::Finding]) -> Result<()> {
    #[derive(serde::Serialize)]
    struct Wire<'a> {
        #[serde(rename = "ruleId")]
        rule_id: &'a str,
        severity: &'a str,
        message: &'a str,
        #[serde(rename = "filePath")]
        file_path: &'a str,
        #[serde(rename = "classFqn")]
        class_fqn: Option<&'a str>,
        #[serde(rename = "memberName")]
        member_name: Option<&'a str>,
        data: &'a std::collections::BTreeMap<String, String>,
    }

    let wire: Vec<Wire> = findings
        .iter()
        .map(|f| Wire {
            rule_id: &f.rule_id,
            severity: f.severity.as_wire_str(),
            message: &f.message,
            file_path: &f.file_path,
            class_fqn: f.class_fqn.as_deref(),
            member_name: f.member_name.as_deref(),
            data: &f.data,
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&wire)?);
    Ok(())
}

fn collect_units(root: &Path) -> Vec<BytecodeUnit> {
    let mut units = Vec::new();
    walk(root, root, &mut units);
    units
}

fn walk(root: &Path, dir: &Path, units: &mut Vec<BytecodeUnit>) {
    let Ok(entries) = std::fs::read_dir(dir) else { return };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            walk(root, &path, units);
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some("class") {
            continue;
        }
        let Ok(bytes) = std::fs::read(&path) else { continue };
        let relative = path.strip_prefix(root).unwrap_or(&path).to_string_lossy().to_string();
        units.push(BytecodeUnit {
            origin_id: relative.clone(),
            location: SourceLocation {
                origin_kind: Some(OriginKind::DirClass),
                origin_path: root.to_string_lossy().to_string(),
                container_path: None,
                entry_path: Some(relative),
                source_file: None,
                line: None,
            },
            bytes,
        });
    }
}
