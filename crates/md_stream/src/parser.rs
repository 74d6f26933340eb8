//! The parse pipeline: normalize, tokenize, repair, reduce.

use tracing::{debug, trace};

use crate::{
    config::{ParseOptions, ParserConfig, merge_custom_tags},
    container,
    error::Result,
    math,
    node::ParsedNode,
    normalize::normalize,
    reduce::{ReduceOptions, reduce},
    repair,
    token::Token,
    tokenizer::{Env, MarkdownTokenizer},
};

/// A tokenizer wired with the extensions of a [`ParserConfig`].
///
/// Building a parser compiles the math command pattern, so build one per
/// configuration and reuse it for every parse. Parsing does not mutate the
/// parser; a single instance can serve concurrent callers.
#[derive(Debug)]
pub struct MarkdownParser {
    tokenizer: MarkdownTokenizer,
    config: ParserConfig,
}

impl MarkdownParser {
    /// Build a parser for `config`.
    ///
    /// Containers are installed before math, so a `:::` line is never read
    /// as bare-bracket math.
    pub fn new(config: ParserConfig) -> Result<Self> {
        config.validate()?;

        let mut tokenizer = MarkdownTokenizer::new();
        if config.enable_containers {
            container::install(&mut tokenizer);
        }
        if config.enable_math {
            math::install(&mut tokenizer, &config.math)?;
        }
        repair::install(&mut tokenizer);

        debug!(
            revision = config.revision,
            math = config.enable_math,
            containers = config.enable_containers,
            custom_tags = config.custom_html_tags.len(),
            "Built markdown parser."
        );

        Ok(Self { tokenizer, config })
    }

    #[must_use]
    pub const fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Returns `true` if this parser was built from the same revision as
    /// `config`. A stale parser should be rebuilt with [`MarkdownParser::new`].
    #[must_use]
    pub const fn is_current(&self, config: &ParserConfig) -> bool {
        self.config.revision == config.revision
    }

    #[must_use]
    pub const fn tokenizer(&self) -> &MarkdownTokenizer {
        &self.tokenizer
    }

    /// Access the rule chains, to add, reorder or disable rules.
    pub const fn tokenizer_mut(&mut self) -> &mut MarkdownTokenizer {
        &mut self.tokenizer
    }

    /// Parse `markdown` into a node tree.
    ///
    /// This never fails: incomplete or malformed syntax becomes loading nodes
    /// or text.
    #[must_use]
    pub fn parse(&self, markdown: &str, options: &ParseOptions) -> Vec<ParsedNode> {
        let tags = merge_custom_tags(&self.config.custom_html_tags, &options.custom_html_tags);
        let nodes = self.parse_nested(markdown, options, options.final_, &tags);

        if options.debug {
            match serde_json::to_string_pretty(&nodes) {
                Ok(tree) => debug!(%tree, "Parsed markdown."),
                Err(error) => debug!(%error, ?nodes, "Parsed markdown."),
            }
        }

        nodes
    }

    /// The token array `parse` would reduce, after the repair passes and the
    /// caller's hooks.
    #[must_use]
    pub fn tokenize(&self, markdown: &str, options: &ParseOptions) -> Vec<Token> {
        let tags = merge_custom_tags(&self.config.custom_html_tags, &options.custom_html_tags);
        let buffer = normalize(markdown, options.final_, &tags, self.config.math.control_bytes);
        self.tokens(&buffer, options, options.final_)
    }

    fn tokens(&self, buffer: &str, options: &ParseOptions, final_: bool) -> Vec<Token> {
        let env = Env {
            final_,
            require_closing_strong: options.require_closing_strong,
        };

        let mut tokens = self.tokenizer.tokenize(buffer, &env);
        if let Some(hook) = &options.pre_transform_tokens {
            tokens = hook(tokens);
        }

        tokens = self.tokenizer.run_core(tokens, &env);
        if let Some(hook) = &options.post_transform_tokens {
            tokens = hook(tokens);
        }

        tokens
    }

    /// Parse `markdown` as a document, or as the content of a custom element.
    fn parse_nested(
        &self,
        markdown: &str,
        options: &ParseOptions,
        final_: bool,
        tags: &[String],
    ) -> Vec<ParsedNode> {
        let buffer = normalize(markdown, final_, tags, self.config.math.control_bytes);
        let tokens = self.tokens(&buffer, options, final_);

        trace!(final_, len = buffer.len(), tokens = tokens.len(), "Reducing tokens.");

        let reparse =
            |content: &str, complete: bool| self.parse_nested(content, options, complete, tags);

        reduce(
            &tokens,
            &buffer,
            markdown,
            ReduceOptions {
                final_,
                custom_tags: tags,
                require_closing_strong: options.require_closing_strong,
            },
            &reparse,
        )
    }
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
