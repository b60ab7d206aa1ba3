use std::path::Path;

use crate::error::{IssueLevel, Result, ShamashError};
use crate::rules::RuleRegistry;

pub fn run(project: &Path, config_override: Option<&Path>) -> Result<()> {
    let config_path = super::locate_config(project, config_override)?;
    let config = super::load_config(&config_path)?;

    let registry = RuleRegistry::default();
    let issues = crate::config::validate(&config, &registry);

    let errors: Vec<_> = issues.iter().filter(|i| i.level == IssueLevel::Error).collect();
    for issue in &issues {
        let tag = match issue.level {
            IssueLevel::Error => "error",
            IssueLevel::Warning => "warning",
        };
        eprintln!("{tag}: {} -- {}", issue.path, issue.message);
    }

    if !errors.is_empty() {
        return Err(ShamashError::ValidationFailed { errors: issues });
    }
    println!("{}: config valid ({} warning(s))", config_path.display(), issues.len());
    Ok(())
}
