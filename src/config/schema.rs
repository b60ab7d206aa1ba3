//! Typed Config v1 schema -- the output of the config binder (C3), input to
//! the semantic validator (C4) and everything downstream.

use std::collections::BTreeMap;

use crate::matcher::MatcherSpec;

pub type RoleId = String;
pub type RuleId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootPackageMode {
    Auto,
    Explicit,
}

#[derive(Debug, Clone)]
pub struct RootPackageConfig {
    pub mode: RootPackageMode,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SourceGlobsConfig {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownRulePolicy {
    Ignore,
    Warn,
    Error,
}

#[derive(Debug, Clone)]
pub struct ValidationConfig {
    pub unknown_rule: UnknownRulePolicy,
}

#[derive(Debug, Clone, Default)]
pub struct ScanLimits {
    pub max_units: Option<u64>,
    pub max_bytes: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ProjectConfig {
    pub root_package: RootPackageConfig,
    pub source_globs: SourceGlobsConfig,
    pub validation: ValidationConfig,
    pub scan_limits: ScanLimits,
    pub bytecode_roots: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RoleDef {
    pub priority: i32,
    pub description: Option<String>,
    pub matcher: MatcherSpec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Hint,
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_wire_str(self) -> &'static str {
        match self {
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
            Severity::Info => "INFO",
            Severity::Hint => "HINT",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RuleScope {
    pub include_roles: Option<Vec<RoleId>>,
    pub exclude_roles: Vec<RoleId>,
    pub include_packages: Vec<String>,
    pub exclude_packages: Vec<String>,
    pub include_globs: Vec<String>,
    pub exclude_globs: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RuleDef {
    pub rule_type: String,
    pub name: String,
    pub roles: Option<Vec<RoleId>>,
    pub enabled: bool,
    pub severity: Severity,
    pub scope: Option<RuleScope>,
    pub params: BTreeMap<String, crate::config::raw::RawValue>,
}

impl RuleDef {
    /// `"type.name"`, the canonical id before any per-role expansion.
    pub fn base_id(&self) -> RuleId {
        format!("{}.{}", self.rule_type, self.name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExceptionMatch {
    pub class_name_regex: Option<String>,
    pub package_regex: Option<String>,
    pub file_path_glob: Option<String>,
    pub role: Option<RoleId>,
    pub member_name: Option<String>,
}

impl ExceptionMatch {
    pub fn has_any_field(&self) -> bool {
        self.class_name_regex.is_some()
            || self.package_regex.is_some()
            || self.file_path_glob.is_some()
            || self.role.is_some()
            || self.member_name.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct ExceptionDef {
    pub id: String,
    pub reason: String,
    pub expires_on: Option<chrono::NaiveDate>,
    pub matcher: ExceptionMatch,
    pub suppress: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub version: u32,
    pub project: ProjectConfig,
    pub roles: BTreeMap<RoleId, RoleDef>,
    pub rules: Vec<RuleDef>,
    pub exceptions: Vec<ExceptionDef>,
}
