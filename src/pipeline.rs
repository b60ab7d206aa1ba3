//! Top-level orchestration: wires C1 through C11 into one scan. Each stage
//! consumes the frozen output of the one before it; nothing here evaluates
//! rules or compiles matchers itself, it only sequences the stage modules.

use rayon::prelude::*;

use crate::cancel::CancellationToken;
use crate::config::schema::Config;
use crate::error::Result;
use crate::extract::{self, BytecodeUnit};
use crate::facts::FactIndex;
use crate::model::Finding;
use crate::roles;
use crate::rules::RuleRegistry;
use crate::suppression::{self, SourceLines};

/// Units are extracted in chunks so a cancellation request lands between
/// groups even when each group runs its units in parallel via rayon -- the
/// per-unit work is independent and the merge in `FactIndex::build` is
/// associative, so chunking doesn't change the result, only how promptly a
/// cancellation is observed.
const EXTRACTION_CHUNK_SIZE: usize = 64;

pub struct ScanOutcome {
    pub facts: FactIndex,
    pub findings: Vec<Finding>,
}

/// Run the full pipeline: extract, index, classify roles, evaluate rules,
/// then apply suppression. `config` must already have passed `config::validate`
/// with no ERROR-level issues.
pub fn run_scan(
    units: &[BytecodeUnit],
    config: &Config,
    registry: &RuleRegistry,
    token: &CancellationToken,
    today: chrono::NaiveDate,
    sources: Option<&dyn SourceLines>,
) -> Result<ScanOutcome> {
    tracing::debug!(unit_count = units.len(), "extracting bytecode units");
    let mut facts = FactIndex::build(extract_all(units, token)?);
    tracing::debug!(class_count = facts.classes_len(), error_count = facts.errors.len(), "stabilized fact index");

    tracing::debug!("classifying roles");
    let assignments = roles::classify(config, &facts);
    facts.attach_roles(assignments);

    tracing::debug!(rule_count = config.rules.len(), "evaluating rules");
    let findings = crate::rules::execute(registry, config, &facts, token)?;

    tracing::debug!(finding_count = findings.len(), exception_count = config.exceptions.len(), "applying suppression");
    let findings = suppression::apply(findings, config, &facts, today, sources);

    Ok(ScanOutcome { facts, findings })
}

fn extract_all(units: &[BytecodeUnit], token: &CancellationToken) -> Result<Vec<extract::PartialFacts>> {
    let mut parts = Vec::with_capacity(units.len());
    for chunk in units.chunks(EXTRACTION_CHUNK_SIZE) {
        if token.is_cancelled() {
            return Err(crate::error::ShamashError::Cancelled);
        }
        let mut chunk_parts: Vec<extract::PartialFacts> = chunk.par_iter().map(extract::extract_unit).collect();
        parts.append(&mut chunk_parts);
    }
    Ok(parts)
}
