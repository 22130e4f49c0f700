use std::collections::BTreeMap;
use std::fmt;

/// A single parameter value.
///
/// Values serialize untagged so that the schema file keeps plain JSON numbers and strings.
/// Integer and float values compare numerically with each other; text only equals text.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Integral number (time steps, angles in whole degrees).
    Int(i64),
    /// Floating point number (offsets, iso-values).
    Float(f64),
    /// Free text (field names, color modes).
    Text(String),
}

/// Parameter-name to value assignment identifying one document (or a partial query).
pub type Descriptor = BTreeMap<String, Value>;

impl Value {
    /// Return `true` for [`Value::Int`] and [`Value::Float`].
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    /// Numeric view of the value, if any.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Text(_) => None,
        }
    }

    /// Text view of the value, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Read back a value from its text form: integer, then float, else text.
    pub fn parse_component(text: &str) -> Self {
        if let Ok(i) = text.parse::<i64>() {
            Self::Int(i)
        } else if let Ok(f) = text.parse::<f64>() {
            Self::Float(f)
        } else {
            Self::Text(text.to_string())
        }
    }

    fn repr(&self) -> String {
        match self {
            Self::Text(s) => format!("'{s}'"),
            other => other.to_string(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Text(_), _) | (_, Self::Text(_)) => false,
            (a, b) => a.as_f64() == b.as_f64(),
        }
    }
}

/// Path-component form used when a value is substituted into a name pattern.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 => {
                write!(f, "{v:.1}")
            }
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Int(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// Render a descriptor as `{'name': value, ...}` in name order.
///
/// Text values are single-quoted; this is the payload written by
/// [`crate::DescriptorTrack`] and the label used in traversal errors.
pub fn format_descriptor(desc: &Descriptor) -> String {
    let body = desc
        .iter()
        .map(|(k, v)| format!("'{k}': {}", v.repr()))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{body}}}")
}

/// Build a [`Descriptor`] from `(name, value)` pairs.
pub fn descriptor<I, K, V>(pairs: I) -> Descriptor
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/value.rs"]
mod tests;
