use std::collections::BTreeMap;
use std::str::FromStr;

use crate::foundation::error::{CinemaError, CinemaResult};
use crate::foundation::value::{Descriptor, Value};
use crate::schema::product::Combinations;

/// Presentation kind of a parameter's value domain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    /// Discrete list of choices (field names, color modes).
    List,
    /// Ordered numeric sweep (angles, time steps, offsets).
    #[default]
    Range,
    /// On/off style toggles.
    Option,
}

impl ParameterKind {
    /// Name used in the schema file.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Range => "range",
            Self::Option => "option",
        }
    }
}

impl FromStr for ParameterKind {
    type Err = CinemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "list" => Ok(Self::List),
            "range" => Ok(Self::Range),
            "option" => Ok(Self::Option),
            other => Err(CinemaError::schema(format!(
                "invalid typechoice '{other}', must be one of [list, range, option]"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// A named axis of variation: its ordered value domain, default, and presentation hints.
///
/// The parameter name is the key it is registered under in a [`ParameterSchema`]; it is
/// not repeated inside the record (the schema file stores parameters as a JSON object).
pub struct Parameter {
    /// Presentation kind (`"type"` in the schema file).
    #[serde(rename = "type")]
    pub kind: ParameterKind,
    /// Human-readable label.
    pub label: String,
    /// Ordered, duplicate-free value domain. Order defines index-to-value mapping.
    pub values: Vec<Value>,
    /// Default value, always a member of `values`.
    pub default: Value,
}

impl Parameter {
    /// Start building a parameter named `name` over `values`.
    pub fn builder<I, V>(name: impl Into<String>, values: I) -> ParameterBuilder
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        ParameterBuilder {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
            default: None,
            typechoice: None,
            label: None,
        }
    }

    /// Check domain invariants: non-empty, duplicate-free, homogeneous, default in domain.
    pub fn validate(&self, name: &str) -> CinemaResult<()> {
        let Some(first) = self.values.first() else {
            return Err(CinemaError::schema(format!(
                "parameter '{name}' must declare at least one value"
            )));
        };
        if self.values.iter().any(|v| v.is_numeric() != first.is_numeric()) {
            return Err(CinemaError::schema(format!(
                "parameter '{name}' mixes numeric and text values"
            )));
        }
        for (i, v) in self.values.iter().enumerate() {
            if self.values[..i].contains(v) {
                return Err(CinemaError::schema(format!(
                    "parameter '{name}' repeats value {v}"
                )));
            }
        }
        if !self.values.contains(&self.default) {
            return Err(CinemaError::schema(format!(
                "invalid default {} for parameter '{name}', must be one of {}",
                self.default,
                self.domain_text()
            )));
        }
        Ok(())
    }

    /// Number of values in the domain.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// `true` when the domain is empty (never the case for a validated parameter).
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Position of `value` in the domain.
    pub fn index_of(&self, value: &Value) -> Option<usize> {
        self.values.iter().position(|v| v == value)
    }

    /// Domain value whose path-component text equals `text`.
    pub fn value_for_component(&self, text: &str) -> Option<&Value> {
        self.values.iter().find(|v| v.to_string() == text)
    }

    fn domain_text(&self) -> String {
        let parts: Vec<String> = self.values.iter().map(ToString::to_string).collect();
        format!("[{}]", parts.join(", "))
    }
}

/// Builder for [`Parameter`] mirroring `make_parameter`'s optional arguments.
pub struct ParameterBuilder {
    name: String,
    values: Vec<Value>,
    default: Option<Value>,
    typechoice: Option<String>,
    label: Option<String>,
}

impl ParameterBuilder {
    /// Default value; the first domain value when unset.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Presentation kind by name (`list`, `range`, or `option`); `range` when unset.
    pub fn typechoice(mut self, typechoice: impl Into<String>) -> Self {
        self.typechoice = Some(typechoice.into());
        self
    }

    /// Label; the parameter name when unset.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Validate and produce the parameter record.
    pub fn build(self) -> CinemaResult<Parameter> {
        let kind = match &self.typechoice {
            Some(t) => t.parse()?,
            None => ParameterKind::default(),
        };
        let default = match self.default {
            Some(v) => v,
            None => self.values.first().cloned().ok_or_else(|| {
                CinemaError::schema(format!(
                    "parameter '{}' must declare at least one value",
                    self.name
                ))
            })?,
        };
        let param = Parameter {
            kind,
            label: self.label.unwrap_or_else(|| self.name.clone()),
            values: self.values,
            default,
        };
        param.validate(&self.name)?;
        Ok(param)
    }
}

/// Build a `range` parameter over `values` with the first value as default.
pub fn make_parameter<I, V>(name: &str, values: I) -> CinemaResult<Parameter>
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    Parameter::builder(name, values).build()
}

/// Mapping from parameter name to [`Parameter`], ordered by name.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ParameterSchema(BTreeMap<String, Parameter>);

impl ParameterSchema {
    /// Empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `param` under `name`, replacing any previous entry.
    pub fn insert(&mut self, name: impl Into<String>, param: Parameter) -> Option<Parameter> {
        self.0.insert(name.into(), param)
    }

    /// Look up a parameter.
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.0.get(name)
    }

    /// Look up a parameter, failing with a schema error when it is not registered.
    pub fn require(&self, name: &str) -> CinemaResult<&Parameter> {
        self.0
            .get(name)
            .ok_or_else(|| CinemaError::schema(format!("unknown parameter '{name}'")))
    }

    /// `true` when `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Parameter names in lexicographic order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `(name, parameter)` pairs in lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Parameter)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of registered parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` when no parameter is registered.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Validate every registered parameter.
    pub fn validate(&self) -> CinemaResult<()> {
        for (name, param) in &self.0 {
            param.validate(name)?;
        }
        Ok(())
    }

    /// Seed every parameter with its default, then overlay `partial`.
    ///
    /// Keys in `partial` that are not schema parameters are carried through unchanged.
    pub fn complete(&self, partial: &Descriptor) -> Descriptor {
        let mut full: Descriptor = self
            .0
            .iter()
            .map(|(name, p)| (name.clone(), p.default.clone()))
            .collect();
        full.extend(partial.iter().map(|(k, v)| (k.clone(), v.clone())));
        full
    }

    /// Cartesian product over the named parameters' domains, in the given name order.
    ///
    /// The last name varies fastest. Every item carries its running index in the full
    /// product, so filtered consumers still see positions in the unfiltered ordering.
    pub fn combinations<S: AsRef<str>>(&self, names: &[S]) -> CinemaResult<Combinations> {
        let mut axes = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            axes.push((name.to_string(), self.require(name)?.values.clone()));
        }
        Ok(Combinations::new(axes))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/schema/parameter.rs"]
mod tests;
