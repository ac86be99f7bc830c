//! Variants
//!
//!     A variant rule names a node in a variant registry, `registry:path/to/node`. A leading `!`
//!     reverses it and a `|true` or `|false` suffix gives the answer to use when no variant
//!     repository is active. Rules drive two directives:
//!
//!         #@variant_if <rule>       opens a block, closed by `#@variant_endif [<rule>]`
//!         #@variant_only <rule>     guards the next declaration only
//!
//!     A declaration is exhibited when every open block resolves active, outermost first,
//!     stopping at the first block that does not. An exhibited declaration is then subject to
//!     the pending `variant_only` guard. The guard is consumed by every declaration, exhibited
//!     or not.
//!
//!     Values may also embed parameters: `@variant(registry:path|default)` in a value segment is
//!     replaced by the current value of that parameter before the values are read.
//!
//!     The reader only talks to [VariantResolver]. [VariantRepository] is a small in-memory
//!     implementation, enough for command line activation and tests.

use crate::props::error::Fault;
use indexmap::IndexMap;
use tracing::trace;

/// Separator between a rule and its fallback value
pub const DEFAULT_SEPARATOR: char = '|';
/// Prefix reversing a rule
pub const REVERSE_MARK: char = '!';
/// Separator between registry name and path
pub const REGISTRY_SEPARATOR: char = ':';

const VARIANT_OPEN_TAG: &str = "@variant(";
const VARIANT_CLOSE_TAG: char = ')';

/// Outcome of resolving a rule
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VariantActivation {
    pub active: bool,
    pub reversed: bool,
}

impl VariantActivation {
    /// Whether the guarded content should be processed
    pub fn exhibits(&self) -> bool {
        self.active != self.reversed
    }
}

/// Answers variant questions for the reader
pub trait VariantResolver: std::fmt::Debug {
    fn resolve(&self, rule: &str) -> Result<VariantActivation, String>;

    /// Expand every `@variant(...)` reference in `segment`
    fn preprocess(&self, segment: &str, remove_quotes: bool) -> Result<String, String>;
}

#[derive(Debug, Clone, Default, PartialEq)]
struct VariantRegistry {
    variants: IndexMap<String, bool>,
    parameters: IndexMap<String, String>,
}

/// In-memory registries of variants and parameters
///
/// The repository counts as active as soon as one registry exists. An inactive repository
/// answers every rule with its `|default`, and fails rules without one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariantRepository {
    registries: IndexMap<String, VariantRegistry>,
}

impl VariantRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        !self.registries.is_empty()
    }

    /// Declare a variant node and its activation, creating the registry if needed
    pub fn set_variant(&mut self, registry: &str, path: &str, active: bool) {
        self.registries
            .entry(registry.to_string())
            .or_default()
            .variants
            .insert(path.to_string(), active);
    }

    pub fn set_parameter(&mut self, registry: &str, path: &str, value: impl Into<String>) {
        self.registries
            .entry(registry.to_string())
            .or_default()
            .parameters
            .insert(path.to_string(), value.into());
    }

    /// Activate `registry:path`
    pub fn activate(&mut self, spec: &str) -> Result<(), String> {
        let (registry, path) = split_registry_path(spec)?;
        self.set_variant(registry, path, true);
        Ok(())
    }

    /// Set a parameter from `registry:path=value`
    pub fn assign(&mut self, spec: &str) -> Result<(), String> {
        let (target, value) = spec
            .split_once('=')
            .ok_or_else(|| format!("missing '=' in variant parameter setting '{}'", spec))?;
        let (registry, path) = split_registry_path(target)?;
        self.set_parameter(registry, path, value);
        Ok(())
    }

    fn resolve_parameter(&self, token: &str, remove_quotes: bool) -> Result<String, String> {
        let (path, default) = match token.split_once(DEFAULT_SEPARATOR) {
            Some((path, default)) => (path, Some(default)),
            None => (token, None),
        };
        let (registry_name, parameter) = split_registry_path(path)?;
        if !self.is_active() {
            return default.map(str::to_string).ok_or_else(|| {
                format!("inactive variant repository while processing '{}'", token)
            });
        }
        let registry = self.registries.get(registry_name).ok_or_else(|| {
            format!(
                "unknown registry '{}' while processing '{}'",
                registry_name, token
            )
        })?;
        let value = registry.parameters.get(parameter).ok_or_else(|| {
            format!(
                "unknown variant parameter '{}' in registry '{}'",
                parameter, registry_name
            )
        })?;
        let value = if remove_quotes {
            strip_quotes(value)
        } else {
            value.as_str()
        };
        Ok(value.to_string())
    }
}

impl VariantResolver for VariantRepository {
    fn resolve(&self, rule: &str) -> Result<VariantActivation, String> {
        let rule = rule.trim();
        let (desc, default) = match rule.split_once(DEFAULT_SEPARATOR) {
            Some((desc, default)) => {
                let default = crate::props::parsing::values::parse_boolean(default.trim())
                    .ok_or_else(|| {
                        format!("invalid default boolean value in variant rule '{}'", rule)
                    })?;
                (desc.trim(), Some(default))
            }
            None => (rule, None),
        };
        let (desc, reversed) = match desc.strip_prefix(REVERSE_MARK) {
            Some(stripped) => (stripped, true),
            None => (desc, false),
        };
        let (registry_name, path) = split_registry_path(desc)?;

        if !self.is_active() {
            return match default {
                Some(active) => Ok(VariantActivation {
                    active,
                    reversed: false,
                }),
                None => Err(format!(
                    "inactive variant repository while processing '{}'",
                    rule
                )),
            };
        }
        let registry = self.registries.get(registry_name).ok_or_else(|| {
            format!(
                "unknown registry '{}' while processing '{}'",
                registry_name, rule
            )
        })?;
        let active = *registry.variants.get(path).ok_or_else(|| {
            format!(
                "unknown variant record '{}' in registry '{}'",
                path, registry_name
            )
        })?;
        trace!(rule, active, reversed, "resolved variant rule");
        Ok(VariantActivation { active, reversed })
    }

    fn preprocess(&self, segment: &str, remove_quotes: bool) -> Result<String, String> {
        let mut out = String::with_capacity(segment.len());
        let mut rest = segment;
        while let Some(start) = rest.find(VARIANT_OPEN_TAG) {
            out.push_str(&rest[..start]);
            let after = &rest[start + VARIANT_OPEN_TAG.len()..];
            let end = after.find(VARIANT_CLOSE_TAG).ok_or_else(|| {
                format!("cannot find variant close tag in '{}'", &rest[start..])
            })?;
            out.push_str(&self.resolve_parameter(&after[..end], remove_quotes)?);
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

fn split_registry_path(desc: &str) -> Result<(&str, &str), String> {
    match desc.split_once(REGISTRY_SEPARATOR) {
        Some((registry, path))
            if !registry.is_empty() && !path.is_empty() && !path.contains(REGISTRY_SEPARATOR) =>
        {
            Ok((registry, path))
        }
        _ => Err(format!("cannot parse variant path tokens from '{}'", desc)),
    }
}

fn strip_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Open `variant_if` blocks and the pending `variant_only` guard
#[derive(Debug, Clone, Default)]
pub struct ConditionalStack {
    rules: Vec<String>,
    only: Option<String>,
}

impl ConditionalStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, rule: impl Into<String>) {
        self.rules.push(rule.into());
    }

    /// Close the innermost block
    ///
    /// When `expected` is given it must equal the innermost rule, up to any `|default` suffix.
    pub fn pop(&mut self, expected: Option<&str>) -> Result<String, Fault> {
        let current = self
            .rules
            .last()
            .ok_or_else(|| Fault::syntax("no conditional variant block to close"))?;
        if let Some(expected) = expected {
            let open = current
                .split(DEFAULT_SEPARATOR)
                .next()
                .unwrap_or_default()
                .trim();
            if open != expected.trim() {
                return Err(Fault::syntax(format!(
                    "unmatching closing variant rule '{}' for block '{}'",
                    expected, current
                )));
            }
        }
        Ok(self.rules.pop().unwrap_or_default())
    }

    pub fn set_only(&mut self, rule: impl Into<String>) {
        self.only = Some(rule.into());
    }

    pub fn has_pending_only(&self) -> bool {
        self.only.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.rules.len()
    }

    pub fn innermost(&self) -> Option<&str> {
        self.rules.last().map(String::as_str)
    }

    /// Decide whether the next declaration is exhibited, consuming the `variant_only` guard
    pub fn exhibits(&mut self, resolver: &dyn VariantResolver) -> Result<bool, Fault> {
        let only = self.only.take();
        for rule in &self.rules {
            let activation = resolver.resolve(rule).map_err(|e| {
                Fault::resolution(format!(
                    "cannot resolve variant if block '{}': {}",
                    rule, e
                ))
            })?;
            if !activation.exhibits() {
                return Ok(false);
            }
        }
        match only {
            Some(rule) => resolver
                .resolve(&rule)
                .map(|activation| activation.exhibits())
                .map_err(|e| {
                    Fault::resolution(format!(
                        "cannot resolve variant only directive '{}': {}",
                        rule, e
                    ))
                }),
            None => Ok(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repository() -> VariantRepository {
        let mut rep = VariantRepository::new();
        rep.set_variant("trigger", "mode/multiplicity", true);
        rep.set_variant("trigger", "mode/coincidence", false);
        rep.set_parameter("trigger", "threshold", "15 mV");
        rep.set_parameter("geometry", "label", "\"main\"");
        rep
    }

    #[test]
    fn test_resolve_active_and_reversed() {
        let rep = repository();
        let on = rep.resolve("trigger:mode/multiplicity").unwrap();
        assert!(on.exhibits());
        let reversed = rep.resolve("!trigger:mode/multiplicity").unwrap();
        assert_eq!(
            reversed,
            VariantActivation {
                active: true,
                reversed: true
            }
        );
        assert!(!reversed.exhibits());
        assert!(!rep.resolve("trigger:mode/coincidence").unwrap().exhibits());
    }

    #[test]
    fn test_resolve_unknowns() {
        let rep = repository();
        assert!(rep.resolve("daq:mode").unwrap_err().contains("unknown registry"));
        assert!(rep
            .resolve("trigger:mode/none")
            .unwrap_err()
            .contains("unknown variant record"));
        assert!(rep.resolve("no-separator").is_err());
    }

    #[test]
    fn test_inactive_repository_uses_default() {
        let rep = VariantRepository::new();
        assert!(rep.resolve("trigger:mode|true").unwrap().exhibits());
        assert!(!rep.resolve("trigger:mode|false").unwrap().exhibits());
        assert!(rep.resolve("trigger:mode").is_err());
    }

    #[test]
    fn test_preprocess_parameters() {
        let rep = repository();
        assert_eq!(
            rep.preprocess("@variant(trigger:threshold) # thr", true).unwrap(),
            "15 mV # thr"
        );
        assert_eq!(
            rep.preprocess("@variant(geometry:label)", true).unwrap(),
            "main"
        );
        assert_eq!(
            rep.preprocess("@variant(geometry:label)", false).unwrap(),
            "\"main\""
        );
        assert_eq!(rep.preprocess("1 2 3", true).unwrap(), "1 2 3");
    }

    #[test]
    fn test_preprocess_default_when_inactive() {
        let rep = VariantRepository::new();
        assert_eq!(
            rep.preprocess("@variant(trigger:threshold|10 mV)", true).unwrap(),
            "10 mV"
        );
        assert!(rep.preprocess("@variant(trigger:threshold)", true).is_err());
        assert!(rep.preprocess("@variant(trigger:threshold", true).is_err());
    }

    #[test]
    fn test_repository_from_command_line_specs() {
        let mut rep = VariantRepository::new();
        rep.activate("setup:calibration").unwrap();
        rep.assign("setup:gain=2.5").unwrap();
        assert!(rep.resolve("setup:calibration").unwrap().exhibits());
        assert_eq!(rep.preprocess("@variant(setup:gain)", true).unwrap(), "2.5");
        assert!(rep.activate("calibration").is_err());
        assert!(rep.assign("setup:gain").is_err());
    }

    #[test]
    fn test_stack_pop_checks_rule_before_default() {
        let mut stack = ConditionalStack::new();
        stack.push("trigger:mode/multiplicity|false");
        assert!(stack.pop(Some("trigger:mode/other")).is_err());
        assert_eq!(
            stack.pop(Some("trigger:mode/multiplicity")).unwrap(),
            "trigger:mode/multiplicity|false"
        );
        assert!(stack.is_empty());
        assert!(stack.pop(None).is_err());
    }

    #[test]
    fn test_exhibits_nested_blocks_and_only_guard() {
        let rep = repository();
        let mut stack = ConditionalStack::new();
        stack.push("trigger:mode/multiplicity");
        assert!(stack.exhibits(&rep).unwrap());

        stack.set_only("trigger:mode/coincidence");
        assert!(!stack.exhibits(&rep).unwrap());
        assert!(!stack.has_pending_only());

        stack.push("!trigger:mode/multiplicity");
        stack.set_only("trigger:undefined");
        // Inhibited by the inner block before the guard is ever resolved
        assert!(!stack.exhibits(&rep).unwrap());
        assert!(!stack.has_pending_only());
    }
}
