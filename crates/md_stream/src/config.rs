//! Parser configuration.
//!
//! [`ParserConfig`] is the construction-time input of
//! [`MarkdownParser`](crate::MarkdownParser). It is an immutable value: to
//! change the configuration of a running application, create a
//! [revised](ParserConfig::revised) copy and rebuild the parser from it.
//!
//! [`ParseOptions`] holds the per-call options of a single parse.

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{error::Result, token::Token};

/// TeX command names that are restored when a math span contains them without
/// their leading backslash.
pub const DEFAULT_MATH_COMMANDS: &[&str] = &[
    "ldots",
    "cdots",
    "quad",
    "qquad",
    "in",
    "end",
    "infty",
    "perp",
    "mid",
    "operatorname",
    "to",
    "rightarrow",
    "leftarrow",
    "Rightarrow",
    "Leftarrow",
    "leftrightarrow",
    "math",
    "mathrm",
    "mathbf",
    "mathit",
    "mathbb",
    "mathcal",
    "mathfrak",
    "implies",
    "alpha",
    "beta",
    "gamma",
    "delta",
    "epsilon",
    "varepsilon",
    "lambda",
    "theta",
    "sigma",
    "omega",
    "Omega",
    "sum",
    "prod",
    "int",
    "oint",
    "sqrt",
    "fbox",
    "boxed",
    "color",
    "rule",
    "edef",
    "fill",
    "hline",
    "text",
    "textbf",
    "boldsymbol",
    "mathring",
    "overline",
    "underline",
    "overbrace",
    "underbrace",
    "widehat",
    "widetilde",
    "frac",
    "dfrac",
    "tfrac",
    "binom",
    "cdot",
    "times",
    "div",
    "pm",
    "mp",
    "leq",
    "geq",
    "neq",
    "approx",
    "equiv",
    "partial",
    "nabla",
    "forall",
    "exists",
    "left",
    "right",
    "begin",
    "vec",
    "hat",
    "lim",
    "log",
    "sin",
    "cos",
    "tan",
];

/// Math extension options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct MathOptions {
    /// TeX command names restored when they appear without a backslash.
    pub commands: Vec<String>,

    /// Escape bare `!` inside math content to `\!`.
    pub escape_exclamation: bool,

    /// Strict delimiter mode.
    ///
    /// Disables bare `[` ... `]` block math, and refuses to emit a loading math
    /// block at the end of a final buffer. An unterminated block then degrades
    /// to plain text.
    pub strict_delimiters: bool,

    /// Which raw control bytes are read as the backslash of a TeX command.
    pub control_bytes: ControlBytes,
}

/// Which raw `\r` and `\n` bytes the normalizer turns back into the
/// backslash of a TeX command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlBytes {
    /// A `\r` followed by `ight` or `ho`, or a `\n` followed by `abla`, `eq`,
    /// `ot` or `exists`, when it follows text.
    #[default]
    Any,

    /// As [`ControlBytes::Any`], but the suffix must end the word and a `\n`
    /// must follow a character that typically precedes a command inside math.
    /// Prose that wraps before "exists" or "notable" is left alone.
    Guarded,
}

impl Default for MathOptions {
    fn default() -> Self {
        Self {
            commands: DEFAULT_MATH_COMMANDS
                .iter()
                .map(ToString::to_string)
                .collect(),
            escape_exclamation: false,
            strict_delimiters: false,
            control_bytes: ControlBytes::default(),
        }
    }
}

/// Construction-time configuration of a [`MarkdownParser`].
///
/// [`MarkdownParser`]: crate::MarkdownParser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ParserConfig {
    /// Enable the math delimiter rules (`$...$`, `$$...$$`, `\(...\)`,
    /// `\[...\]`).
    pub enable_math: bool,

    /// Enable the `::: name {json}` container rule.
    pub enable_containers: bool,

    /// Math extension options.
    pub math: MathOptions,

    /// HTML-like tag names promoted to custom element nodes, for every parse
    /// made with this configuration.
    pub custom_html_tags: Vec<String>,

    /// Revision stamp of this configuration.
    ///
    /// Incremented by [`ParserConfig::revised`], compared by
    /// [`MarkdownParser::is_current`](crate::MarkdownParser::is_current).
    pub revision: u64,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            enable_math: true,
            enable_containers: true,
            math: MathOptions::default(),
            custom_html_tags: vec![],
            revision: 0,
        }
    }
}

impl ParserConfig {
    /// Load a configuration from a JSON document.
    ///
    /// Missing fields take their default value.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the custom HTML tags.
    #[must_use]
    pub fn with_custom_html_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.custom_html_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Set the math options.
    #[must_use]
    pub fn with_math(mut self, math: MathOptions) -> Self {
        self.math = math;
        self
    }

    /// Enable or disable the math rules.
    #[must_use]
    pub const fn with_math_enabled(mut self, enabled: bool) -> Self {
        self.enable_math = enabled;
        self
    }

    /// Enable or disable the container rule.
    #[must_use]
    pub const fn with_containers_enabled(mut self, enabled: bool) -> Self {
        self.enable_containers = enabled;
        self
    }

    /// Returns a copy of this configuration with the revision incremented.
    ///
    /// Use this when hot-swapping configuration: parsers built from the old
    /// revision report themselves as stale.
    #[must_use]
    pub fn revised(&self) -> Self {
        Self {
            revision: self.revision.wrapping_add(1),
            ..self.clone()
        }
    }

    /// Check the configuration for values the parser cannot work with.
    pub fn validate(&self) -> Result<()> {
        if let Some(tag) = self
            .custom_html_tags
            .iter()
            .find(|tag| !is_valid_tag_name(tag))
        {
            return Err(crate::Error::InvalidConfig(format!(
                "invalid custom HTML tag name: {tag:?}"
            )));
        }

        if let Some(command) = self
            .math
            .commands
            .iter()
            .find(|c| c.is_empty() || !c.chars().all(|c| c.is_ascii_alphabetic()))
        {
            return Err(crate::Error::InvalidConfig(format!(
                "invalid math command name: {command:?}"
            )));
        }

        Ok(())
    }
}

/// A hook that rewrites the flat token array.
pub type TokenTransform = Arc<dyn Fn(Vec<Token>) -> Vec<Token> + Send + Sync>;

/// Per-call parse options.
#[derive(Clone, Default)]
pub struct ParseOptions {
    /// Whether the stream is complete.
    ///
    /// Final parses skip the mid-state heuristics and never report a node as
    /// loading: unterminated fences and math at the end of the input are
    /// treated as implicitly closed.
    pub final_: bool,

    /// Additional custom HTML tags for this call, merged with the tags of the
    /// parser configuration.
    pub custom_html_tags: Vec<String>,

    /// Require a closing `**` before emitting a strong node.
    ///
    /// When `false`, an unclosed `**` in a streaming buffer is rendered as a
    /// loading strong node instead of literal asterisks.
    pub require_closing_strong: bool,

    /// Runs on the tokenizer output, before the core repair passes.
    pub pre_transform_tokens: Option<TokenTransform>,

    /// Runs after the core repair passes, right before reduction.
    pub post_transform_tokens: Option<TokenTransform>,

    /// Log the resulting tree at `debug` level.
    pub debug: bool,
}

impl fmt::Debug for ParseOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseOptions")
            .field("final", &self.final_)
            .field("custom_html_tags", &self.custom_html_tags)
            .field("require_closing_strong", &self.require_closing_strong)
            .field(
                "pre_transform_tokens",
                &self.pre_transform_tokens.as_ref().map(|_| "<fn>"),
            )
            .field(
                "post_transform_tokens",
                &self.post_transform_tokens.as_ref().map(|_| "<fn>"),
            )
            .field("debug", &self.debug)
            .finish()
    }
}

impl ParseOptions {
    /// Options for a buffer that is still growing.
    #[must_use]
    pub fn streaming() -> Self {
        Self::default()
    }

    /// Options for a complete buffer.
    #[must_use]
    pub fn complete() -> Self {
        Self {
            final_: true,
            ..Self::default()
        }
    }

    /// Set whether the stream is complete.
    #[must_use]
    pub const fn with_final(mut self, final_: bool) -> Self {
        self.final_ = final_;
        self
    }

    /// Set the custom HTML tags for this call.
    #[must_use]
    pub fn with_custom_html_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.custom_html_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Require a closing `**` before emitting a strong node.
    #[must_use]
    pub const fn with_require_closing_strong(mut self, require: bool) -> Self {
        self.require_closing_strong = require;
        self
    }

    /// Set the pre-transform hook.
    #[must_use]
    pub fn with_pre_transform<F>(mut self, hook: F) -> Self
    where
        F: Fn(Vec<Token>) -> Vec<Token> + Send + Sync + 'static,
    {
        self.pre_transform_tokens = Some(Arc::new(hook));
        self
    }

    /// Set the post-transform hook.
    #[must_use]
    pub fn with_post_transform<F>(mut self, hook: F) -> Self
    where
        F: Fn(Vec<Token>) -> Vec<Token> + Send + Sync + 'static,
    {
        self.post_transform_tokens = Some(Arc::new(hook));
        self
    }

    /// Log the resulting tree.
    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

/// Lowercased, de-duplicated union of two custom tag lists.
pub(crate) fn merge_custom_tags(config: &[String], call: &[String]) -> Vec<String> {
    let mut tags: Vec<String> = config
        .iter()
        .chain(call)
        .map(|tag| tag.trim().to_ascii_lowercase())
        .filter(|tag| is_valid_tag_name(tag))
        .collect();

    tags.sort_unstable();
    tags.dedup();
    tags
}

fn is_valid_tag_name(tag: &str) -> bool {
    let mut chars = tag.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ':')
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
