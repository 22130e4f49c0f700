use regex::Regex;

use crate::foundation::error::{CinemaError, CinemaResult};
use crate::foundation::value::{Descriptor, Value};
use crate::schema::parameter::ParameterSchema;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A compiled file name template such as `"{time}/{theta}_{phi}.png"`.
///
/// `/` in the template produces sub directories. Compilation yields the ordered placeholder
/// names and a parser that recovers placeholder text from a path with any leading directories.
/// The file suffix (text after the last `.` of the final literal) is matched loosely so that
/// documents written with an extension override are still found.
#[derive(Clone, Debug)]
pub struct NamePattern {
    template: String,
    segments: Vec<Segment>,
    placeholders: Vec<String>,
    parser: Regex,
}

impl NamePattern {
    /// Compile `template`.
    pub fn compile(template: &str) -> CinemaResult<Self> {
        let segments = tokenize(template)?;
        let placeholders = segments
            .iter()
            .filter_map(|s| match s {
                Segment::Placeholder(name) => Some(name.clone()),
                Segment::Literal(_) => None,
            })
            .collect();
        let body = regex_body(&segments, |_| "([^/]+?)".to_string());
        let parser = Regex::new(&format!("(?:^|/){body}$"))
            .map_err(|e| CinemaError::schema(format!("name pattern '{template}': {e}")))?;
        Ok(Self {
            template: template.to_string(),
            segments,
            placeholders,
            parser,
        })
    }

    /// The template text.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Placeholder names in template order (repeats included).
    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    /// `true` when `name` occurs as a placeholder.
    pub fn has_placeholder(&self, name: &str) -> bool {
        self.placeholders.iter().any(|p| p == name)
    }

    /// Suffix after the last `.` of the template, including the dot.
    pub fn image_type(&self) -> Option<&str> {
        let last = self.template.rsplit('/').next()?;
        last.rfind('.').map(|i| &last[i..])
    }

    /// Substitute descriptor values into the template.
    pub fn format(&self, desc: &Descriptor) -> CinemaResult<String> {
        let mut out = String::new();
        for seg in &self.segments {
            match seg {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    let value = desc.get(name).ok_or_else(|| {
                        CinemaError::query(format!(
                            "descriptor has no value for placeholder '{{{name}}}'"
                        ))
                    })?;
                    out.push_str(&value.to_string());
                }
            }
        }
        Ok(out)
    }

    /// Glob form of `query`: `*` for every placeholder the query leaves open.
    pub fn glob(&self, query: &Descriptor) -> String {
        self.segments
            .iter()
            .map(|seg| match seg {
                Segment::Literal(text) => text.clone(),
                Segment::Placeholder(name) => query
                    .get(name)
                    .map_or_else(|| "*".to_string(), ToString::to_string),
            })
            .collect()
    }

    /// Matcher for store-relative paths selected by [`NamePattern::glob`].
    ///
    /// Unlike a textual glob, substituted values are matched literally and `*` never crosses
    /// a directory separator.
    pub fn matcher(&self, query: &Descriptor) -> CinemaResult<Regex> {
        let body = regex_body(&self.segments, |name| match query.get(name) {
            Some(v) => regex::escape(&v.to_string()),
            None => "[^/]*".to_string(),
        });
        Regex::new(&format!("^{body}$"))
            .map_err(|e| CinemaError::query(format!("query over '{}': {e}", self.template)))
    }

    /// Recover placeholder text from `path` (using `/` separators).
    ///
    /// Every placeholder matches as little as possible, so a value containing the literal
    /// that follows it is split early. [`NamePattern::schema_parser`] avoids that for
    /// registered parameters.
    pub fn parse<'p>(&self, path: &'p str) -> Option<Vec<(&str, &'p str)>> {
        self.captures(&self.parser, path)
    }

    /// Path parser that tries each registered parameter's domain spellings (longest first)
    /// before falling back to the generic component match.
    pub fn schema_parser(&self, schema: &ParameterSchema) -> CinemaResult<Regex> {
        let body = regex_body(&self.segments, |name| match schema.get(name) {
            Some(param) => {
                let mut texts: Vec<String> = param.values.iter().map(ToString::to_string).collect();
                texts.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
                texts.dedup();
                let alternatives: Vec<String> = texts.iter().map(|t| regex::escape(t)).collect();
                format!("({}|[^/]+?)", alternatives.join("|"))
            }
            None => "([^/]+?)".to_string(),
        });
        Regex::new(&format!("(?:^|/){body}$"))
            .map_err(|e| CinemaError::schema(format!("name pattern '{}': {e}", self.template)))
    }

    /// Recover a descriptor from `path`, mapping text back onto schema domains.
    ///
    /// Text that is not a domain value (or belongs to an unregistered placeholder) is kept
    /// as a number when it parses as one, else as text.
    pub fn descriptor_for(&self, path: &str, schema: &ParameterSchema) -> Option<Descriptor> {
        let parser = self.schema_parser(schema).ok()?;
        self.descriptor_with(&parser, path, schema)
    }

    /// [`NamePattern::descriptor_for`] with a parser built once by
    /// [`NamePattern::schema_parser`].
    pub fn descriptor_with(
        &self,
        parser: &Regex,
        path: &str,
        schema: &ParameterSchema,
    ) -> Option<Descriptor> {
        let parts = self.captures(parser, path)?;
        Some(
            parts
                .into_iter()
                .map(|(name, text)| {
                    let value = schema
                        .get(name)
                        .and_then(|p| p.value_for_component(text))
                        .cloned()
                        .unwrap_or_else(|| Value::parse_component(text));
                    (name.to_string(), value)
                })
                .collect(),
        )
    }

    fn captures<'p>(&self, parser: &Regex, path: &'p str) -> Option<Vec<(&str, &'p str)>> {
        let caps = parser.captures(path)?;
        Some(
            self.placeholders
                .iter()
                .enumerate()
                .filter_map(|(i, name)| caps.get(i + 1).map(|m| (name.as_str(), m.as_str())))
                .collect(),
        )
    }
}

fn tokenize(template: &str) -> CinemaResult<Vec<Segment>> {
    if template.trim().is_empty() {
        return Err(CinemaError::schema("name pattern must be non-empty"));
    }
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars();
    while let Some(c) = chars.next() {
        match c {
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    if c == '{' {
                        break;
                    }
                    name.push(c);
                }
                if !closed || name.trim().is_empty() {
                    return Err(CinemaError::schema(format!(
                        "name pattern '{template}' has a malformed placeholder"
                    )));
                }
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Placeholder(name));
            }
            '}' => {
                return Err(CinemaError::schema(format!(
                    "name pattern '{template}' has an unmatched '}}'"
                )));
            }
            c => literal.push(c),
        }
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

fn regex_body(segments: &[Segment], mut placeholder: impl FnMut(&str) -> String) -> String {
    let mut out = String::new();
    let last = segments.len().saturating_sub(1);
    for (i, seg) in segments.iter().enumerate() {
        match seg {
            Segment::Literal(text) if i == last => out.push_str(&loose_suffix(text)),
            Segment::Literal(text) => out.push_str(&regex::escape(text)),
            Segment::Placeholder(name) => out.push_str(&placeholder(name)),
        }
    }
    out
}

fn loose_suffix(text: &str) -> String {
    let file_part = text.rsplit('/').next().unwrap_or(text);
    match file_part.rfind('.') {
        Some(dot) if dot + 1 < file_part.len() => {
            let split = text.len() - file_part.len() + dot;
            format!(r"{}\.[^/.]+", regex::escape(&text[..split]))
        }
        _ => regex::escape(text),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/store/pattern.rs"]
mod tests;
