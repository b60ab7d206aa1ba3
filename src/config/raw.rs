//! The dynamic tree shape the config binder (C3) reads from: `Map`, `List`,
//! or scalar. Kept independent of `serde_yaml` beyond a conversion so the
//! binder's error paths never depend on a specific source format.

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Map(BTreeMap<String, RawValue>),
    List(Vec<RawValue>),
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl RawValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            RawValue::Map(_) => "map",
            RawValue::List(_) => "list",
            RawValue::String(_) => "string",
            RawValue::Int(_) => "int",
            RawValue::Float(_) => "float",
            RawValue::Bool(_) => "bool",
            RawValue::Null => "null",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, RawValue>> {
        match self {
            RawValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[RawValue]> {
        match self {
            RawValue::List(l) => Some(l),
            _ => None,
        }
    }

    /// Any scalar coerces to a string for binding purposes (enum matching,
    /// regex patterns, ...); maps/lists do not.
    pub fn as_scalar_string(&self) -> Option<String> {
        match self {
            RawValue::String(s) => Some(s.clone()),
            RawValue::Int(i) => Some(i.to_string()),
            RawValue::Float(f) => Some(f.to_string()),
            RawValue::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            RawValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RawValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<serde_yaml::Value> for RawValue {
    fn from(v: serde_yaml::Value) -> Self {
        match v {
            serde_yaml::Value::Null => RawValue::Null,
            serde_yaml::Value::Bool(b) => RawValue::Bool(b),
            serde_yaml::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    RawValue::Int(i)
                } else if let Some(f) = n.as_f64() {
                    RawValue::Float(f)
                } else {
                    RawValue::Null
                }
            }
            serde_yaml::Value::String(s) => RawValue::String(s),
            serde_yaml::Value::Sequence(seq) => {
                RawValue::List(seq.into_iter().map(RawValue::from).collect())
            }
            serde_yaml::Value::Mapping(map) => {
                let mut out = BTreeMap::new();
                for (k, v) in map {
                    if let serde_yaml::Value::String(key) = k {
                        out.insert(key, RawValue::from(v));
                    }
                }
                RawValue::Map(out)
            }
            serde_yaml::Value::Tagged(tagged) => RawValue::from(tagged.value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_mapping_converts_to_sorted_map() {
        let v: serde_yaml::Value = serde_yaml::from_str("b: 1\na: 2\n").unwrap();
        let raw = RawValue::from(v);
        let map = raw.as_map().unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
