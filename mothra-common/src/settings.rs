//! Engine settings: parameter metadata and the two-stage merge
//!
//! Engines accept settings from three places, applied in a fixed order where the
//! later source wins:
//!
//! 1. compiled defaults from the engine's [`ParamMetadata`] table
//! 2. a user-supplied settings file (`:- set(Name, Value).` facts)
//! 3. explicit component parameters
//!
//! [`merge_settings`] is the only place this order is implemented.

use crate::workflow::InputDict;
use crate::{Error, Result};
use std::collections::BTreeMap;
use tracing::debug;

/// Metadata for one engine parameter
///
/// Single source of truth for the parameter name, its default and its validation.
#[derive(Debug, Clone, Copy)]
pub struct ParamMetadata {
    /// Setting name as understood by the engine
    pub key: &'static str,
    /// Default value, in the engine's textual syntax
    pub default_value: &'static str,
    /// Human-readable description
    pub description: &'static str,
    /// Validator function (returns Ok(()) or an error message)
    pub validator: fn(&str) -> std::result::Result<(), String>,
}

impl ParamMetadata {
    /// Validate a candidate value, prefixing errors with the key
    pub fn validate(&self, value: &str) -> Result<()> {
        (self.validator)(value).map_err(|e| Error::invalid(format!("{}: {}", self.key, e)))
    }
}

/// Free text that cannot close a term or start a new clause
pub fn plain_value(s: &str) -> std::result::Result<(), String> {
    if s.contains(":-")
        || s
            .chars()
            .any(|c| matches!(c, '.' | '(' | ')' | '\'' | '"' | '%') || c.is_control())
    {
        return Err(format!("'{}' contains characters not allowed in a setting", s));
    }
    Ok(())
}

/// Non-negative integer
pub fn non_negative_int(s: &str) -> std::result::Result<(), String> {
    s.trim()
        .parse::<u64>()
        .map(|_| ())
        .map_err(|_| format!("'{}' is not a non-negative integer", s))
}

/// Non-negative integer or the Prolog atom `inf`
pub fn int_or_inf(s: &str) -> std::result::Result<(), String> {
    if s.trim() == "inf" {
        return Ok(());
    }
    non_negative_int(s).map_err(|_| format!("'{}' is neither an integer nor 'inf'", s))
}

/// Finite floating point number
pub fn float_value(s: &str) -> std::result::Result<(), String> {
    match s.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(()),
        _ => Err(format!("'{}' is not a number", s)),
    }
}

/// `true` or `false`
pub fn bool_value(s: &str) -> std::result::Result<(), String> {
    match s.trim() {
        "true" | "false" => Ok(()),
        _ => Err(format!("'{}' is not 'true' or 'false'", s)),
    }
}

/// Merged settings, ordered by name for reproducible engine input
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineSettings(BTreeMap<String, String>);

impl EngineSettings {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render as Prolog `:- set(Name, Value).` directives
    pub fn to_prolog_directives(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!(":- set({}, {}).\n", k, v))
            .collect()
    }

    /// Render as `-name value` command-line arguments
    pub fn to_cli_args(&self) -> Vec<String> {
        self.0
            .iter()
            .flat_map(|(k, v)| [format!("-{}", k), v.clone()])
            .collect()
    }
}

/// Parse a settings file made of `set(Name, Value).` facts or directives.
///
/// `%` comments and blank lines are skipped; lines that are not `set/2` facts are
/// ignored (settings files often carry mode declarations as well).
pub fn parse_settings_facts(text: &str) -> Result<Vec<(String, String)>> {
    let mut settings = Vec::new();

    for (line_no, raw) in text.lines().enumerate() {
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }

        let body = line.strip_prefix(":-").unwrap_or(line).trim();
        let Some(args) = body.strip_prefix("set(") else {
            debug!(line = line_no + 1, "Skipping non-setting line in settings file");
            continue;
        };

        let args = args
            .trim_end()
            .strip_suffix('.')
            .map(str::trim_end)
            .and_then(|a| a.strip_suffix(')'))
            .ok_or_else(|| {
                Error::invalid(format!("settings line {}: malformed set/2 fact", line_no + 1))
            })?;

        let (name, value) = split_first_argument(args).ok_or_else(|| {
            Error::invalid(format!("settings line {}: set/2 needs two arguments", line_no + 1))
        })?;

        settings.push((name.to_string(), value.to_string()));
    }

    Ok(settings)
}

/// Merge defaults, file settings and explicit parameters (later wins).
///
/// Only keys listed in `metadata` are taken from `explicit`; a settings file may
/// carry any other engine setting and passes it through untouched. Known keys are
/// validated whichever source they come from.
pub fn merge_settings(
    metadata: &[ParamMetadata],
    file_settings: &[(String, String)],
    explicit: &InputDict,
) -> Result<EngineSettings> {
    let mut merged = EngineSettings::default();

    for meta in metadata {
        merged.set(meta.key, meta.default_value);
    }

    for (key, value) in file_settings {
        if let Some(meta) = metadata.iter().find(|m| m.key == key) {
            meta.validate(value)?;
        }
        merged.set(key.clone(), value.clone());
    }

    for meta in metadata {
        if let Some(value) = explicit.non_empty_str(meta.key) {
            meta.validate(&value)?;
            merged.set(meta.key, value);
        }
    }

    Ok(merged)
}

fn strip_comment(line: &str) -> &str {
    let mut in_quote = false;
    for (i, c) in line.char_indices() {
        match c {
            '\'' => in_quote = !in_quote,
            '%' if !in_quote => return &line[..i],
            _ => {}
        }
    }
    line
}

/// Split `a, b(c, d)` at the first top-level comma
fn split_first_argument(args: &str) -> Option<(&str, &str)> {
    let mut depth = 0i32;
    let mut in_quote = false;
    for (i, c) in args.char_indices() {
        match c {
            '\'' => in_quote = !in_quote,
            '(' | '[' if !in_quote => depth += 1,
            ')' | ']' if !in_quote => depth -= 1,
            ',' if !in_quote && depth == 0 => {
                let name = args[..i].trim();
                let value = args[i + 1..].trim();
                if name.is_empty() || value.is_empty() {
                    return None;
                }
                return Some((name, value));
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const META: &[ParamMetadata] = &[
        ParamMetadata {
            key: "depth",
            default_value: "10",
            description: "Proof depth",
            validator: non_negative_int,
        },
        ParamMetadata {
            key: "noise",
            default_value: "0",
            description: "Allowed negatives",
            validator: non_negative_int,
        },
    ];

    #[test]
    fn test_parse_settings_facts() {
        let text = "% aleph settings\n:- set(depth, 20).\nset(evalfn, 'coverage'). % trailing\n\n:- modeh(1, p(+t)).\n:- set(lookahead, f(1,2)).\n";
        let settings = parse_settings_facts(text).unwrap();
        assert_eq!(
            settings,
            vec![
                ("depth".to_string(), "20".to_string()),
                ("evalfn".to_string(), "'coverage'".to_string()),
                ("lookahead".to_string(), "f(1,2)".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_settings_rejects_malformed_set() {
        assert!(parse_settings_facts(":- set(depth 20).").is_err());
        assert!(parse_settings_facts(":- set(depth, 20)").is_err());
    }

    #[test]
    fn test_defaults_apply_when_nothing_given() {
        let merged = merge_settings(META, &[], &InputDict::new()).unwrap();
        assert_eq!(merged.get("depth"), Some("10"));
        assert_eq!(merged.get("noise"), Some("0"));
    }

    #[test]
    fn test_file_overrides_default() {
        let file = vec![("depth".to_string(), "3".to_string())];
        let merged = merge_settings(META, &file, &InputDict::new()).unwrap();
        assert_eq!(merged.get("depth"), Some("3"));
    }

    #[test]
    fn test_explicit_parameter_beats_settings_file() {
        let file = vec![
            ("depth".to_string(), "3".to_string()),
            ("clauselength".to_string(), "4".to_string()),
        ];
        let explicit = InputDict::new().with("depth", "7").with("noise", "");
        let merged = merge_settings(META, &file, &explicit).unwrap();

        assert_eq!(merged.get("depth"), Some("7"));
        // empty explicit value does not override
        assert_eq!(merged.get("noise"), Some("0"));
        // unknown file settings pass through
        assert_eq!(merged.get("clauselength"), Some("4"));
    }

    #[test]
    fn test_invalid_explicit_value_rejected() {
        let explicit = InputDict::new().with("depth", "deep");
        let err = merge_settings(META, &[], &explicit).unwrap_err();
        assert!(err.to_string().contains("depth"));
    }

    #[test]
    fn test_plain_value_cannot_break_out_of_a_directive() {
        assert!(plain_value("count,min,max").is_ok());
        assert!(plain_value("pos class").is_ok());
        for bad in ["a).\n:- halt", "x:-y", "'q'", "a.b", "f(x)", "line\nbreak"] {
            assert!(plain_value(bad).is_err(), "{}", bad);
        }
    }

    #[test]
    fn test_rendering() {
        let mut settings = EngineSettings::default();
        settings.set("b", "2");
        settings.set("a", "1");
        assert_eq!(settings.to_prolog_directives(), ":- set(a, 1).\n:- set(b, 2).\n");
        assert_eq!(settings.to_cli_args(), vec!["-a", "1", "-b", "2"]);
    }
}
