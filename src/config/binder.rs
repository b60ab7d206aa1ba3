//! C3 -- Config Binder: strictly shape-and-type binding from a `RawValue`
//! tree into the typed [`Config`]. No semantic interpretation (that's C4):
//! an unknown role id or an uncompilable regex binds fine here and is
//! rejected later, with a path, by the validator.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::error::ConfigBindError;
use crate::matcher::MatcherSpec;

use super::raw::RawValue;
use super::schema::*;

type BindResult<T> = Result<T, ConfigBindError>;

fn err(path: &str, message: impl Into<String>) -> ConfigBindError {
    ConfigBindError { path: path.to_string(), message: message.into() }
}

fn field<'a>(map: &'a BTreeMap<String, RawValue>, _path: &str, key: &str) -> Option<&'a RawValue> {
    map.get(key).filter(|v| !v.is_null())
}

fn require_map<'a>(value: &'a RawValue, path: &str) -> BindResult<&'a BTreeMap<String, RawValue>> {
    value
        .as_map()
        .ok_or_else(|| err(path, format!("expected a map, got {}", value.type_name())))
}

fn require_list<'a>(value: &'a RawValue, path: &str) -> BindResult<&'a [RawValue]> {
    value
        .as_list()
        .ok_or_else(|| err(path, format!("expected a list, got {}", value.type_name())))
}

fn require_string(value: &RawValue, path: &str) -> BindResult<String> {
    match value {
        RawValue::String(s) => Ok(s.clone()),
        other => Err(err(path, format!("expected a string, got {}", other.type_name()))),
    }
}

fn require_bool(value: &RawValue, path: &str) -> BindResult<bool> {
    value.as_bool().ok_or_else(|| err(path, format!("expected a bool, got {}", value.type_name())))
}

fn require_i64(value: &RawValue, path: &str) -> BindResult<i64> {
    value.as_i64().ok_or_else(|| err(path, format!("expected an int, got {}", value.type_name())))
}

fn required<'a>(map: &'a BTreeMap<String, RawValue>, path: &str, key: &str) -> BindResult<&'a RawValue> {
    field(map, path, key).ok_or_else(|| err(&format!("{path}.{key}"), "required key is missing"))
}

fn string_list(value: &RawValue, path: &str) -> BindResult<Vec<String>> {
    require_list(value, path)?
        .iter()
        .enumerate()
        .map(|(i, v)| require_string(v, &format!("{path}[{i}]")))
        .collect()
}

/// Case-insensitive, trimmed enum match with a standard "must be one of" error.
fn bind_enum<'a, T: Copy>(value: &str, path: &str, variants: &'a [(&'a str, T)]) -> BindResult<T> {
    let needle = value.trim().to_ascii_lowercase();
    variants
        .iter()
        .find(|(name, _)| name.to_ascii_lowercase() == needle)
        .map(|(_, v)| *v)
        .ok_or_else(|| {
            err(
                path,
                format!(
                    "must be one of: {}",
                    variants.iter().map(|(n, _)| *n).collect::<Vec<_>>().join(", ")
                ),
            )
        })
}

/// Entry point: bind a full config tree.
pub fn bind(raw: &RawValue) -> BindResult<Config> {
    let root = require_map(raw, "$")?;

    let version = require_i64(required(root, "$", "version")?, "$.version")? as u32;

    let project = bind_project(required(root, "$", "project")?, "$.project")?;

    let mut roles = BTreeMap::new();
    if let Some(roles_val) = field(root, "$", "roles") {
        let roles_map = require_map(roles_val, "$.roles")?;
        for (id, def) in roles_map {
            roles.insert(id.clone(), bind_role(def, &format!("$.roles.{id}"))?);
        }
    }

    let mut rules = Vec::new();
    if let Some(rules_val) = field(root, "$", "rules") {
        for (i, rule_val) in require_list(rules_val, "$.rules")?.iter().enumerate() {
            rules.push(bind_rule(rule_val, &format!("$.rules[{i}]"))?);
        }
    }

    let mut exceptions = Vec::new();
    if let Some(exc_val) = field(root, "$", "exceptions") {
        for (i, exc) in require_list(exc_val, "$.exceptions")?.iter().enumerate() {
            exceptions.push(bind_exception(exc, &format!("$.exceptions[{i}]"))?);
        }
    }

    Ok(Config { version, project, roles, rules, exceptions })
}

fn bind_project(value: &RawValue, path: &str) -> BindResult<ProjectConfig> {
    let map = require_map(value, path)?;

    let root_package = match field(map, path, "rootPackage") {
        Some(v) => bind_root_package(v, &format!("{path}.rootPackage"))?,
        None => RootPackageConfig { mode: RootPackageMode::Auto, value: None },
    };

    let source_globs = match field(map, path, "sourceGlobs") {
        Some(v) => bind_source_globs(v, &format!("{path}.sourceGlobs"))?,
        None => SourceGlobsConfig::default(),
    };

    let validation = match field(map, path, "validation") {
        Some(v) => bind_validation(v, &format!("{path}.validation"))?,
        None => ValidationConfig { unknown_rule: UnknownRulePolicy::Warn },
    };

    let scan_limits = match field(map, path, "scanLimits") {
        Some(v) => bind_scan_limits(v, &format!("{path}.scanLimits"))?,
        None => ScanLimits::default(),
    };

    let bytecode_roots = match field(map, path, "bytecodeRoots") {
        Some(v) => string_list(v, &format!("{path}.bytecodeRoots"))?,
        None => Vec::new(),
    };

    Ok(ProjectConfig { root_package, source_globs, validation, scan_limits, bytecode_roots })
}

fn bind_root_package(value: &RawValue, path: &str) -> BindResult<RootPackageConfig> {
    let map = require_map(value, path)?;
    let mode = match field(map, path, "mode") {
        Some(v) => bind_enum(
            &require_string(v, &format!("{path}.mode"))?,
            &format!("{path}.mode"),
            &[("AUTO", RootPackageMode::Auto), ("EXPLICIT", RootPackageMode::Explicit)],
        )?,
        None => RootPackageMode::Auto,
    };
    let value_str = match field(map, path, "value") {
        Some(v) => Some(require_string(v, &format!("{path}.value"))?),
        None => None,
    };
    Ok(RootPackageConfig { mode, value: value_str })
}

fn bind_source_globs(value: &RawValue, path: &str) -> BindResult<SourceGlobsConfig> {
    let map = require_map(value, path)?;
    let include = match field(map, path, "include") {
        Some(v) => string_list(v, &format!("{path}.include"))?,
        None => Vec::new(),
    };
    let exclude = match field(map, path, "exclude") {
        Some(v) => string_list(v, &format!("{path}.exclude"))?,
        None => Vec::new(),
    };
    Ok(SourceGlobsConfig { include, exclude })
}

fn bind_validation(value: &RawValue, path: &str) -> BindResult<ValidationConfig> {
    let map = require_map(value, path)?;
    let unknown_rule = match field(map, path, "unknownRule") {
        Some(v) => bind_enum(
            &require_string(v, &format!("{path}.unknownRule"))?,
            &format!("{path}.unknownRule"),
            &[
                ("IGNORE", UnknownRulePolicy::Ignore),
                ("WARN", UnknownRulePolicy::Warn),
                ("ERROR", UnknownRulePolicy::Error),
            ],
        )?,
        None => UnknownRulePolicy::Warn,
    };
    Ok(ValidationConfig { unknown_rule })
}

fn bind_scan_limits(value: &RawValue, path: &str) -> BindResult<ScanLimits> {
    let map = require_map(value, path)?;
    let max_units = match field(map, path, "maxUnits") {
        Some(v) => Some(require_i64(v, &format!("{path}.maxUnits"))? as u64),
        None => None,
    };
    let max_bytes = match field(map, path, "maxBytes") {
        Some(v) => Some(require_i64(v, &format!("{path}.maxBytes"))? as u64),
        None => None,
    };
    Ok(ScanLimits { max_units, max_bytes })
}

fn bind_role(value: &RawValue, path: &str) -> BindResult<RoleDef> {
    let map = require_map(value, path)?;
    let priority = require_i64(required(map, path, "priority")?, &format!("{path}.priority"))? as i32;
    let description = match field(map, path, "description") {
        Some(v) => Some(require_string(v, &format!("{path}.description"))?),
        None => None,
    };
    let matcher = bind_matcher(required(map, path, "match")?, &format!("{path}.match"))?;
    Ok(RoleDef { priority, description, matcher })
}

/// The matcher tree is itself a tagged map: `{type: "anyOf", of: [...]}`, etc.
/// `type` keys use lower camelCase matching the wire matcher names.
fn bind_matcher(value: &RawValue, path: &str) -> BindResult<MatcherSpec> {
    let map = require_map(value, path)?;
    let ty = require_string(required(map, path, "type")?, &format!("{path}.type"))?;

    Ok(match ty.as_str() {
        "anyOf" => MatcherSpec::AnyOf(bind_matcher_list(required(map, path, "of")?, &format!("{path}.of"))?),
        "allOf" => MatcherSpec::AllOf(bind_matcher_list(required(map, path, "of")?, &format!("{path}.of"))?),
        "not" => MatcherSpec::Not(Box::new(bind_matcher(
            required(map, path, "matcher")?,
            &format!("{path}.matcher"),
        )?)),
        "annotation" => MatcherSpec::Annotation(require_string(
            required(map, path, "fqn")?,
            &format!("{path}.fqn"),
        )?),
        "annotationPrefix" => MatcherSpec::AnnotationPrefix(require_string(
            required(map, path, "prefix")?,
            &format!("{path}.prefix"),
        )?),
        "packageRegex" => MatcherSpec::PackageRegex(require_string(
            required(map, path, "pattern")?,
            &format!("{path}.pattern"),
        )?),
        "packageContainsSegment" => MatcherSpec::PackageContainsSegment(require_string(
            required(map, path, "segment")?,
            &format!("{path}.segment"),
        )?),
        "classNameRegex" => MatcherSpec::ClassNameRegex(require_string(
            required(map, path, "pattern")?,
            &format!("{path}.pattern"),
        )?),
        "classNameEndsWith" => MatcherSpec::ClassNameEndsWith(require_string(
            required(map, path, "suffix")?,
            &format!("{path}.suffix"),
        )?),
        "classNameEndsWithAny" => MatcherSpec::ClassNameEndsWithAny(string_list(
            required(map, path, "suffixes")?,
            &format!("{path}.suffixes"),
        )?),
        "hasMainMethod" => MatcherSpec::HasMainMethod(require_bool(
            required(map, path, "value")?,
            &format!("{path}.value"),
        )?),
        "implements" => MatcherSpec::Implements(require_string(
            required(map, path, "fqn")?,
            &format!("{path}.fqn"),
        )?),
        "extends" => MatcherSpec::Extends(require_string(
            required(map, path, "fqn")?,
            &format!("{path}.fqn"),
        )?),
        other => {
            return Err(err(
                &format!("{path}.type"),
                format!("unknown matcher type '{other}'"),
            ))
        }
    })
}

fn bind_matcher_list(value: &RawValue, path: &str) -> BindResult<Vec<MatcherSpec>> {
    require_list(value, path)?
        .iter()
        .enumerate()
        .map(|(i, v)| bind_matcher(v, &format!("{path}[{i}]")))
        .collect()
}

fn bind_rule(value: &RawValue, path: &str) -> BindResult<RuleDef> {
    let map = require_map(value, path)?;

    let rule_type = require_string(required(map, path, "type")?, &format!("{path}.type"))?;
    let name = require_string(required(map, path, "name")?, &format!("{path}.name"))?;

    // Missing roles key binds to wildcard (None); explicit null also binds
    // to wildcard since `field()` filters nulls before we ever see them.
    let roles = match map.get("roles") {
        Some(v) if !v.is_null() => Some(string_list(v, &format!("{path}.roles"))?),
        _ => None,
    };

    let enabled = match field(map, path, "enabled") {
        Some(v) => require_bool(v, &format!("{path}.enabled"))?,
        None => true,
    };

    let severity = match field(map, path, "severity") {
        Some(v) => bind_enum(
            &require_string(v, &format!("{path}.severity"))?,
            &format!("{path}.severity"),
            &[
                ("ERROR", Severity::Error),
                ("WARNING", Severity::Warning),
                ("INFO", Severity::Info),
                ("HINT", Severity::Hint),
            ],
        )?,
        None => Severity::Warning,
    };

    let scope = match field(map, path, "scope") {
        Some(v) => Some(bind_scope(v, &format!("{path}.scope"))?),
        None => None,
    };

    // Omitted or explicitly null params bind to an empty map.
    let params = match map.get("params") {
        Some(v) if !v.is_null() => require_map(v, &format!("{path}.params"))?.clone(),
        _ => BTreeMap::new(),
    };

    Ok(RuleDef { rule_type, name, roles, enabled, severity, scope, params })
}

fn bind_scope(value: &RawValue, path: &str) -> BindResult<RuleScope> {
    let map = require_map(value, path)?;
    let include_roles = match map.get("includeRoles") {
        Some(v) if !v.is_null() => Some(string_list(v, &format!("{path}.includeRoles"))?),
        _ => None,
    };
    let exclude_roles = match field(map, path, "excludeRoles") {
        Some(v) => string_list(v, &format!("{path}.excludeRoles"))?,
        None => Vec::new(),
    };
    let include_packages = match field(map, path, "includePackages") {
        Some(v) => string_list(v, &format!("{path}.includePackages"))?,
        None => Vec::new(),
    };
    let exclude_packages = match field(map, path, "excludePackages") {
        Some(v) => string_list(v, &format!("{path}.excludePackages"))?,
        None => Vec::new(),
    };
    let include_globs = match field(map, path, "includeGlobs") {
        Some(v) => string_list(v, &format!("{path}.includeGlobs"))?,
        None => Vec::new(),
    };
    let exclude_globs = match field(map, path, "excludeGlobs") {
        Some(v) => string_list(v, &format!("{path}.excludeGlobs"))?,
        None => Vec::new(),
    };
    Ok(RuleScope {
        include_roles,
        exclude_roles,
        include_packages,
        exclude_packages,
        include_globs,
        exclude_globs,
    })
}

fn bind_exception(value: &RawValue, path: &str) -> BindResult<ExceptionDef> {
    let map = require_map(value, path)?;

    let id = require_string(required(map, path, "id")?, &format!("{path}.id"))?;
    let reason = require_string(required(map, path, "reason")?, &format!("{path}.reason"))?;

    let expires_on = match field(map, path, "expiresOn") {
        Some(v) => {
            let s = require_string(v, &format!("{path}.expiresOn"))?;
            Some(
                NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                    .map_err(|_| err(&format!("{path}.expiresOn"), "must be ISO-8601 YYYY-MM-DD"))?,
            )
        }
        None => None,
    };

    let matcher = bind_exception_match(required(map, path, "match")?, &format!("{path}.match"))?;

    let suppress = string_list(required(map, path, "suppress")?, &format!("{path}.suppress"))?;

    Ok(ExceptionDef { id, reason, expires_on, matcher, suppress })
}

fn bind_exception_match(value: &RawValue, path: &str) -> BindResult<ExceptionMatch> {
    let map = require_map(value, path)?;
    Ok(ExceptionMatch {
        class_name_regex: match field(map, path, "classNameRegex") {
            Some(v) => Some(require_string(v, &format!("{path}.classNameRegex"))?),
            None => None,
        },
        package_regex: match field(map, path, "packageRegex") {
            Some(v) => Some(require_string(v, &format!("{path}.packageRegex"))?),
            None => None,
        },
        file_path_glob: match field(map, path, "filePathGlob") {
            Some(v) => Some(require_string(v, &format!("{path}.filePathGlob"))?),
            None => None,
        },
        role: match field(map, path, "role") {
            Some(v) => Some(require_string(v, &format!("{path}.role"))?),
            None => None,
        },
        member_name: match field(map, path, "memberName") {
            Some(v) => Some(require_string(v, &format!("{path}.memberName"))?),
            None => None,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn map(pairs: Vec<(&str, RawValue)>) -> RawValue {
        let mut m = BTreeMap::new();
        for (k, v) in pairs {
            m.insert(k.to_string(), v);
        }
        RawValue::Map(m)
    }

    #[test]
    fn missing_required_key_reports_dotted_path() {
        let raw = map(vec![("version", RawValue::Int(1))]);
        let result = bind(&raw);
        assert!(matches!(result, Err(e) if e.path == "$.project"));
    }

    #[test]
    fn rule_roles_missing_binds_to_wildcard() {
        let rule = map(vec![
            ("type", RawValue::String("metrics".into())),
            ("name", RawValue::String("maxFanIn".into())),
        ]);
        let bound = bind_rule(&rule, "$.rules[0]").unwrap();
        assert!(bound.roles.is_none());
        assert!(bound.enabled);
        assert!(bound.params.is_empty());
    }

    #[test]
    fn unknown_enum_value_reports_must_be_one_of() {
        let validation = map(vec![("unknownRule", RawValue::String("BOGUS".into()))]);
        let result = bind_validation(&validation, "$.project.validation");
        assert!(matches!(result, Err(e) if e.message.starts_with("must be one of")));
    }
}
