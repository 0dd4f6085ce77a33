//! Route template compilation.
//!
//! # Responsibilities
//! - Scan `<type:name>` placeholders left to right
//! - Escape literal spans, substitute converter fragments
//! - Anchor as `^...$` (leaf) or `^...` (internal)
//! - Match a path and convert its captures
//!
//! # Design Decisions
//! - Unknown converter types fail compilation, naming the type
//! - Compiled regexes are size-limited
//! - Captures are converted all-or-nothing: a failed conversion is a miss

use std::sync::{Arc, OnceLock};

use regex::{Regex, RegexBuilder};

use crate::converters::{Converter, ConverterRegistry, ParamValue};
use crate::routing::RouteError;

/// Placeholder syntax; `/`, `<`, `>` and `:` are not allowed inside type or name.
const TOKEN_PATTERN: &str = "<([^<>/:]+):([^<>/:]+)>";

/// Maximum size of a compiled route regex.
const MAX_REGEX_SIZE: usize = 1 << 20;

fn token_regex() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(TOKEN_PATTERN).expect("token pattern is valid"))
}

/// Leaf nodes own handlers; internal nodes own children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Leaf,
    Internal,
}

/// A declared parameter: name plus the converter that decodes it.
#[derive(Debug, Clone)]
pub struct ParamInfo {
    pub name: String,
    pub converter: Arc<Converter>,
}

/// A compiled route template.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    template: String,
    fragment: String,
    regex: Regex,
    params: Vec<ParamInfo>,
    kind: NodeKind,
}

impl CompiledPattern {
    pub fn compile(
        template: &str,
        kind: NodeKind,
        registry: &ConverterRegistry,
    ) -> Result<Self, RouteError> {
        let mut fragment = String::with_capacity(template.len() * 2);
        let mut params = Vec::new();
        let mut last = 0;

        for token in token_regex().find_iter(template) {
            fragment.push_str(&regex::escape(&template[last..token.start()]));

            let inner = &token.as_str()[1..token.as_str().len() - 1];
            let (type_name, param_name) = inner.split_once(':').unwrap_or((inner, ""));
            let converter = registry
                .get(type_name)
                .ok_or_else(|| RouteError::UnknownConverter {
                    template: template.to_string(),
                    converter: type_name.to_string(),
                })?;

            fragment.push_str(converter.fragment());
            params.push(ParamInfo {
                name: param_name.to_string(),
                converter,
            });
            last = token.end();
        }
        fragment.push_str(&regex::escape(&template[last..]));

        let anchored = match kind {
            NodeKind::Leaf => format!("^{}$", fragment),
            NodeKind::Internal => format!("^{}", fragment),
        };
        let regex = RegexBuilder::new(&anchored)
            .size_limit(MAX_REGEX_SIZE)
            .build()
            .map_err(|source| RouteError::InvalidPattern {
                template: template.to_string(),
                source,
            })?;

        Ok(Self {
            template: template.to_string(),
            fragment,
            regex,
            params,
            kind,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Unanchored regex source.
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn params(&self) -> &[ParamInfo] {
        &self.params
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Number of capture groups, excluding the whole match.
    pub fn capture_count(&self) -> usize {
        self.regex.captures_len() - 1
    }

    /// Template text before the first placeholder.
    pub fn literal_prefix(&self) -> &str {
        match token_regex().find(&self.template) {
            Some(m) => &self.template[..m.start()],
            None => &self.template,
        }
    }

    /// Match `path`, appending converted captures to `out`.
    ///
    /// Returns the length of the matched prefix. On a miss, or when any
    /// capture fails conversion, nothing is appended.
    pub fn match_into(&self, path: &str, out: &mut Vec<(String, ParamValue)>) -> Option<usize> {
        let caps = self.regex.captures(path)?;
        if caps.len() - 1 != self.params.len() {
            return None;
        }

        let mut converted = Vec::with_capacity(self.params.len());
        for (info, group) in self.params.iter().zip(caps.iter().skip(1)) {
            let raw = group?.as_str();
            match info.converter.convert(raw) {
                Ok(value) => converted.push((info.name.clone(), value)),
                Err(e) => {
                    tracing::trace!(
                        template = %self.template,
                        param = %info.name,
                        error = %e,
                        "Converter rejected capture"
                    );
                    return None;
                }
            }
        }

        let consumed = caps.get(0).map_or(0, |m| m.end());
        out.extend(converted);
        Some(consumed)
    }

    /// Convenience wrapper around [`match_into`](Self::match_into).
    pub fn matches(&self, path: &str) -> Option<Vec<(String, ParamValue)>> {
        let mut out = Vec::new();
        self.match_into(path, &mut out).map(|_| out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::ConvertError;

    fn registry() -> ConverterRegistry {
        ConverterRegistry::with_builtins()
    }

    fn leaf(template: &str) -> CompiledPattern {
        CompiledPattern::compile(template, NodeKind::Leaf, &registry()).unwrap()
    }

    #[test]
    fn test_each_builtin_has_one_capture() {
        let cases = [
            ("int", "42", "4x2"),
            ("str", "hello", "a/b"),
            ("string", "hello", ""),
            ("slug", "my-post_1", "my post"),
            ("uuid", "67e55044-10b1-426f-9247-bb680e5fe0c8", "67e55044-10b1-426f-9247"),
            ("path", "a/b/c.txt", ""),
            ("float", "3.14", "3.x"),
            ("bool", "true", "maybe"),
        ];
        for (ty, valid, invalid) in cases {
            let pattern = leaf(&format!("<{}:v>", ty));
            assert_eq!(pattern.capture_count(), 1, "{}", ty);
            assert!(pattern.matches(valid).is_some(), "{} should match {:?}", ty, valid);
            assert!(pattern.matches(invalid).is_none(), "{} should reject {:?}", ty, invalid);
        }
    }

    #[test]
    fn test_literal_metacharacters_escaped() {
        let pattern = leaf("a.b+c");
        assert_eq!(pattern.capture_count(), 0);
        assert!(pattern.params().is_empty());
        assert!(pattern.matches("a.b+c").is_some());
        assert!(pattern.matches("aXbc").is_none());
        assert!(pattern.matches("a.bbc").is_none());
        assert!(pattern.matches("a.b+cd").is_none());
    }

    #[test]
    fn test_params_in_order_and_typed() {
        let pattern = leaf("user/<int:id>/posts/<slug:slug>");
        let names: Vec<&str> = pattern.params().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["id", "slug"]);

        let params = pattern.matches("user/7/posts/hello-world").unwrap();
        assert_eq!(
            params,
            vec![
                ("id".to_string(), ParamValue::Int(7)),
                ("slug".to_string(), ParamValue::Str("hello-world".into())),
            ]
        );
    }

    #[test]
    fn test_unknown_converter_fails() {
        let err = CompiledPattern::compile("x/<money:amount>", NodeKind::Leaf, &registry()).unwrap_err();
        assert!(matches!(err, RouteError::UnknownConverter { ref converter, .. } if converter == "money"));
        assert!(err.to_string().contains("money"));
    }

    #[test]
    fn test_internal_is_prefix_anchored() {
        let pattern = CompiledPattern::compile("api/", NodeKind::Internal, &registry()).unwrap();
        let mut out = Vec::new();
        assert_eq!(pattern.match_into("api/users/1", &mut out), Some(4));
        assert_eq!(pattern.match_into("v1/api/", &mut out), None);

        let leaf = leaf("api/");
        assert!(leaf.matches("api/users/1").is_none());
    }

    #[test]
    fn test_conversion_failure_is_a_miss() {
        let mut reg = ConverterRegistry::with_builtins();
        reg.register("even", "([0-9]+)", |raw: &str| -> Result<ParamValue, ConvertError> {
            let n: i64 = raw.parse().map_err(|_| ConvertError("nan".into()))?;
            if n % 2 == 0 {
                Ok(ParamValue::Int(n))
            } else {
                Err(ConvertError("odd".into()))
            }
        })
        .unwrap();

        let pattern = CompiledPattern::compile("n/<even:n>", NodeKind::Leaf, &reg).unwrap();
        let mut out = Vec::new();
        assert!(pattern.match_into("n/3", &mut out).is_none());
        assert!(out.is_empty());
        assert!(pattern.match_into("n/4", &mut out).is_some());
        assert_eq!(out, vec![("n".to_string(), ParamValue::Int(4))]);
    }

    #[test]
    fn test_literal_prefix() {
        assert_eq!(leaf("users/<int:id>/edit").literal_prefix(), "users/");
        assert_eq!(leaf("static/files").literal_prefix(), "static/files");
    }

    #[test]
    fn test_malformed_tokens_are_literals() {
        let pattern = leaf("a/<int>/b");
        assert!(pattern.params().is_empty());
        assert!(pattern.matches("a/<int>/b").is_some());
    }
}
