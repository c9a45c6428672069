use std::collections::BTreeMap;

/// One named configuration value as seen by frame jobs.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    /// Boolean flag.
    Bool(bool),
    /// Integral number.
    Int(i64),
    /// Floating-point number.
    Float(f64),
    /// Text or path.
    Str(String),
    /// Ordered list (colors, crop corners).
    List(Vec<ParamValue>),
}

impl ParamValue {
    fn from_json(v: &serde_json::Value) -> Option<Self> {
        use serde_json::Value;
        Some(match v {
            Value::Null => return None,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64()?),
            },
            Value::String(s) => Self::Str(s.clone()),
            Value::Array(items) => Self::List(items.iter().filter_map(Self::from_json).collect()),
            Value::Object(_) => Self::Str(v.to_string()),
        })
    }

    /// Numeric value; integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }
}

/// Read-only `section.key` lookup built from [`Settings`](crate::Settings).
///
/// Nested objects are flattened with `.` separators, so the keyboard mask depth is
/// `keyboard.mask` and the dots lifetime is `effects.dots.lifetime_secs`. Unset optional values
/// are absent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParamMap {
    values: BTreeMap<String, ParamValue>,
}

impl ParamMap {
    /// Flatten a JSON document.
    pub fn from_json(value: &serde_json::Value) -> Self {
        let mut out = Self::default();
        out.flatten("", value);
        out
    }

    fn flatten(&mut self, prefix: &str, value: &serde_json::Value) {
        if let serde_json::Value::Object(map) = value {
            for (k, v) in map {
                let name = if prefix.is_empty() {
                    k.clone()
                } else {
                    format!("{prefix}.{k}")
                };
                self.flatten(&name, v);
            }
        } else if let Some(v) = ParamValue::from_json(value) {
            self.values.insert(prefix.to_owned(), v);
        }
    }

    /// Add or replace a value.
    pub fn insert(&mut self, name: impl Into<String>, value: ParamValue) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(ParamValue::as_f64)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// All names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/config/params.rs"]
mod tests;
