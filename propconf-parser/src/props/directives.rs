//! Meta-directives
//!
//!     A comment whose first word starts with `@` is a meta-directive. Directives are handled in
//!     two steps: [parse_directive] turns the text into a [Directive] value without looking at any
//!     state, then [apply] executes it against the [ParserContext] (and, for `@config`, the
//!     destination store).
//!
//!     Directive families:
//!
//!         stream      @end, @topic, @config/@configuration
//!         property    @description/@parameter
//!         override    @allow_key_override, @forbid_key_override
//!         variants    @enable_variants, @disable_variants, @variant_if, @variant_only,
//!                     @variant_endif, @variant_devel, @variant_no_devel,
//!                     @variant_remove_quotes, @variant_preserve_quotes
//!         units       @enable_real_with_unit, @disable_real_with_unit
//!         includes    @include, @include_try, @include_dir, @include_path_env,
//!                     @include_no_propagate, @include_debug, @forbid_include
//!         tracing     @verbose_parsing, @mute_parsing
//!
//!     Stream and include setup directives are only valid before the first property record.
//!     Include directives resolve their target right away; resolved files are queued on the
//!     context and read by the reader once the directive line is done.

use crate::props::context::ParserContext;
use crate::props::error::Fault;
use crate::props::store::PropertyStore;
use tracing::{debug, trace, warn};

/// A parsed meta-directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    End,
    Topic(String),
    Config(String),
    Description(String),
    AllowKeyOverride(bool),
    ForbidKeyOverride(bool),
    EnableVariants,
    DisableVariants,
    VariantIf(String),
    VariantOnly(String),
    VariantEndif(Option<String>),
    VariantDevel(bool),
    VariantRemoveQuotes(bool),
    RealWithUnit(bool),
    Include { path: String, optional: bool },
    IncludeDir(String),
    IncludePathEnv(String),
    IncludeNoPropagate,
    IncludeDebug,
    ForbidInclude,
    VerboseParsing(bool),
}

impl Directive {
    fn is_variant_family(&self) -> bool {
        matches!(
            self,
            Directive::VariantIf(_)
                | Directive::VariantOnly(_)
                | Directive::VariantEndif(_)
                | Directive::VariantDevel(_)
                | Directive::VariantRemoveQuotes(_)
        )
    }
}

/// What the reader does after a directive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Parse directive text starting at `@`
pub fn parse_directive(text: &str) -> Result<Directive, Fault> {
    let text = text.trim();
    let (name, rest) = match text.find(char::is_whitespace) {
        Some(pos) => (&text[..pos], text[pos..].trim()),
        None => (text, ""),
    };

    let directive = match name {
        "@end" => Directive::End,
        "@topic" => Directive::Topic(strip_quotes(rest).to_string()),
        "@config" | "@configuration" => Directive::Config(strip_quotes(rest).to_string()),
        "@description" | "@parameter" => Directive::Description(rest.to_string()),
        "@allow_key_override" => Directive::AllowKeyOverride(read_flag(name, rest)?),
        "@forbid_key_override" => Directive::ForbidKeyOverride(read_flag(name, rest)?),
        "@enable_variants" => Directive::EnableVariants,
        "@disable_variants" => Directive::DisableVariants,
        "@variant_if" => Directive::VariantIf(read_rule(name, rest)?),
        "@variant_only" => Directive::VariantOnly(read_rule(name, rest)?),
        "@variant_endif" => Directive::VariantEndif(read_word(name, rest)?),
        "@variant_devel" => Directive::VariantDevel(true),
        "@variant_no_devel" => Directive::VariantDevel(false),
        "@variant_remove_quotes" => Directive::VariantRemoveQuotes(true),
        "@variant_preserve_quotes" => Directive::VariantRemoveQuotes(false),
        "@enable_real_with_unit" => Directive::RealWithUnit(true),
        "@disable_real_with_unit" => Directive::RealWithUnit(false),
        "@include" => Directive::Include {
            path: read_argument(name, rest)?,
            optional: false,
        },
        "@include_try" => Directive::Include {
            path: read_argument(name, rest)?,
            optional: true,
        },
        "@include_dir" => Directive::IncludeDir(read_argument(name, rest)?),
        "@include_path_env" => Directive::IncludePathEnv(read_argument(name, rest)?),
        "@include_no_propagate" => Directive::IncludeNoPropagate,
        "@include_debug" => Directive::IncludeDebug,
        "@forbid_include" => Directive::ForbidInclude,
        "@verbose_parsing" => Directive::VerboseParsing(true),
        "@mute_parsing" => Directive::VerboseParsing(false),
        other => {
            return Err(Fault::syntax(format!(
                "unsupported meta directive '{}'",
                other
            )))
        }
    };
    Ok(directive)
}

fn strip_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn read_flag(name: &str, rest: &str) -> Result<bool, Fault> {
    match rest.to_ascii_lowercase().as_str() {
        "" | "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(Fault::syntax(format!(
            "invalid flag '{}' for directive '{}'",
            rest, name
        ))),
    }
}

fn read_rule(name: &str, rest: &str) -> Result<String, Fault> {
    read_word(name, rest)?
        .ok_or_else(|| Fault::syntax(format!("missing variant rule for directive '{}'", name)))
}

/// First whitespace-delimited word; a `#` remainder is a comment
fn read_word(name: &str, rest: &str) -> Result<Option<String>, Fault> {
    if rest.is_empty() || rest.starts_with('#') {
        return Ok(None);
    }
    let (word, tail) = match rest.find(char::is_whitespace) {
        Some(pos) => (&rest[..pos], rest[pos..].trim()),
        None => (rest, ""),
    };
    if !tail.is_empty() && !tail.starts_with('#') {
        return Err(Fault::syntax(format!(
            "unsupported trailing text '{}' after rule of directive '{}'",
            tail, name
        )));
    }
    Ok(Some(word.to_string()))
}

/// A quoted (`"` or `'`) or bare single argument
fn read_argument(name: &str, rest: &str) -> Result<String, Fault> {
    let mut chars = rest.chars();
    let (value, tail) = match chars.next() {
        None => {
            return Err(Fault::syntax(format!(
                "missing argument for directive '{}'",
                name
            )))
        }
        Some(quote @ ('"' | '\'')) => {
            let body = &rest[1..];
            let end = body.find(quote).ok_or_else(|| {
                Fault::syntax(format!(
                    "missing closing quote in argument of directive '{}'",
                    name
                ))
            })?;
            (&body[..end], body[end + 1..].trim())
        }
        Some(_) => match rest.find(char::is_whitespace) {
            Some(pos) => (&rest[..pos], rest[pos..].trim()),
            None => (rest, ""),
        },
    };
    if !tail.is_empty() && !tail.starts_with('#') {
        return Err(Fault::syntax(format!(
            "unsupported trailing text '{}' after argument of directive '{}'",
            tail, name
        )));
    }
    Ok(value.to_string())
}

fn before_first_property(ctx: &ParserContext, name: &str) -> Result<(), Fault> {
    if ctx.parsing_started {
        return Err(Fault::syntax(format!(
            "directive '{}' is not allowed after the first property record",
            name
        )));
    }
    Ok(())
}

fn inclusion_enabled(ctx: &ParserContext, name: &str) -> Result<(), Fault> {
    if !ctx.file_inclusion {
        return Err(Fault::semantic(format!(
            "directive '{}' is not allowed: file inclusion is disabled",
            name
        )));
    }
    Ok(())
}

/// Execute `directive` against the context
pub fn apply(
    directive: Directive,
    ctx: &mut ParserContext,
    store: &mut PropertyStore,
) -> Result<Flow, Fault> {
    if ctx.verbose {
        debug!(line = ctx.line, ?directive, "meta directive");
    }
    if directive.is_variant_family() {
        if ctx.variants_forbidden {
            return Err(Fault::semantic(
                "variant directives are forbidden for this reader",
            ));
        }
        if !ctx.variants_enabled
            && !matches!(
                directive,
                Directive::VariantDevel(_) | Directive::VariantRemoveQuotes(_)
            )
        {
            return Err(Fault::semantic("variant directives are disabled"));
        }
    }

    match directive {
        Directive::End => {
            if ctx.property_pending() {
                return Err(Fault::syntax(
                    "unexpected end of stream while a property declaration is pending",
                ));
            }
            return Ok(Flow::Stop);
        }
        Directive::Topic(topic) => {
            before_first_property(ctx, "@topic")?;
            if topic.is_empty() {
                warn!(line = ctx.line, "empty topic");
            } else if let Some(seen) = &ctx.topic {
                warn!(line = ctx.line, seen = %seen, ignored = %topic, "topic already set");
            } else {
                if let Some(expected) = &ctx.expected_topic {
                    if expected != &topic {
                        return Err(Fault::semantic(format!(
                            "topic '{}' does not match the expected topic '{}'",
                            topic, expected
                        )));
                    }
                }
                ctx.topic = Some(topic);
            }
        }
        Directive::Config(text) => {
            before_first_property(ctx, "@config")?;
            if ctx.config_seen {
                warn!(line = ctx.line, "store description already set; ignoring");
            } else {
                store.set_description(text);
                ctx.config_seen = true;
            }
        }
        Directive::Description(text) => {
            if text.is_empty() {
                if ctx.parsing_started {
                    return Err(Fault::syntax("missing property description"));
                }
                trace!(line = ctx.line, "empty description ignored");
            } else {
                ctx.pending_description = Some(text);
                ctx.parsing_started = true;
            }
        }
        Directive::AllowKeyOverride(allow) => {
            ctx.allow_key_override = allow;
            if !allow {
                ctx.include_allow_override = false;
            }
        }
        Directive::ForbidKeyOverride(forbid) => {
            ctx.allow_key_override = !forbid;
            if forbid {
                ctx.include_allow_override = false;
            }
        }
        Directive::EnableVariants => {
            if ctx.variants_forbidden {
                return Err(Fault::semantic(
                    "variants cannot be enabled: they are forbidden for this reader",
                ));
            }
            ctx.variants_enabled = true;
        }
        Directive::DisableVariants => ctx.variants_enabled = false,
        Directive::VariantIf(rule) => {
            if ctx.variant_devel {
                debug!(line = ctx.line, rule = %rule, depth = ctx.conditionals.depth() + 1, "open variant block");
            }
            ctx.conditionals.push(rule);
            ctx.parsing_started = true;
        }
        Directive::VariantOnly(rule) => {
            ctx.conditionals.set_only(rule);
            ctx.parsing_started = true;
        }
        Directive::VariantEndif(rule) => {
            let closed = ctx.conditionals.pop(rule.as_deref())?;
            if ctx.variant_devel {
                debug!(line = ctx.line, rule = %closed, "close variant block");
            }
        }
        Directive::VariantDevel(on) => ctx.variant_devel = on,
        Directive::VariantRemoveQuotes(on) => ctx.remove_quotes = on,
        Directive::RealWithUnit(on) => ctx.real_with_unit = on,
        Directive::Include { path, optional } => {
            let name = if optional { "@include_try" } else { "@include" };
            inclusion_enabled(ctx, name)?;
            ctx.parsing_started = true;
            match ctx.resolver.resolve(&path) {
                Ok(resolved) => {
                    if ctx.include_debug {
                        debug!(path = %path, resolved = %resolved.display(), "queue include");
                    }
                    ctx.pending_includes.push(resolved);
                }
                Err(reason) if optional => {
                    warn!(line = ctx.line, path = %path, %reason, "optional include skipped");
                }
                Err(reason) => {
                    return Err(Fault::resolution(format!(
                        "cannot resolve include path '{}': {}",
                        path, reason
                    )))
                }
            }
        }
        Directive::IncludeDir(dir) => {
            if ctx.resolver_fixed {
                trace!(dir = %dir, "include resolver is fixed; include dir ignored");
            } else {
                inclusion_enabled(ctx, "@include_dir")?;
                before_first_property(ctx, "@include_dir")?;
                ctx.resolver
                    .append_search_dir(&dir)
                    .map_err(Fault::resolution)?;
            }
        }
        Directive::IncludePathEnv(name) => {
            if ctx.resolver_fixed {
                trace!(env = %name, "include resolver is fixed; path env ignored");
            } else {
                inclusion_enabled(ctx, "@include_path_env")?;
                before_first_property(ctx, "@include_path_env")?;
                ctx.resolver.set_path_env(&name).map_err(Fault::syntax)?;
            }
        }
        Directive::IncludeNoPropagate => {
            before_first_property(ctx, "@include_no_propagate")?;
            ctx.include_propagate = false;
        }
        Directive::IncludeDebug => {
            ctx.include_debug = true;
            ctx.resolver.set_debug(true);
        }
        Directive::ForbidInclude => ctx.file_inclusion = false,
        Directive::VerboseParsing(on) => ctx.verbose = on,
    }
    Ok(Flow::Continue)
}
