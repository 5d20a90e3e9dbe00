//! The mention grammar, compiled.
//!
//! Persisted text carries tokens like `{@42|Jane Doe}`; the editable surface
//! shows `<span class="mention">@Jane Doe</span>`. Both patterns are built
//! from a [`SyntaxConfig`] so the sigil and markers can be changed per
//! deployment.

use std::ops::Range;
use std::sync::LazyLock;

use aquifer_common::{AquiferError, SyntaxConfig};
use regex::Regex;

use crate::types::CandidateId;

static DEFAULT_SYNTAX: LazyLock<MentionSyntax> = LazyLock::new(|| {
    MentionSyntax::new(SyntaxConfig::default()).expect("default mention syntax is valid")
});

/// A persisted token found in plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMatch<'a> {
    /// Byte range of the whole token.
    pub range: Range<usize>,
    /// Parsed id. None when the digits overflow.
    pub id: Option<CandidateId>,
    /// Cached display name stored in the token.
    pub cached_name: &'a str,
}

/// A mention element found in markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementMatch<'a> {
    /// Byte range of the element, tags included.
    pub range: Range<usize>,
    /// Byte range of the inner text (sigil included).
    pub inner_range: Range<usize>,
    /// Raw inner markup, still entity-encoded.
    pub inner: &'a str,
}

/// Compiled mention grammar.
#[derive(Debug, Clone)]
pub struct MentionSyntax {
    config: SyntaxConfig,
    token_re: Regex,
    element_re: Regex,
}

impl MentionSyntax {
    /// Validate the configuration and compile its patterns.
    pub fn new(config: SyntaxConfig) -> Result<Self, AquiferError> {
        config.validate()?;
        let esc = |c: char| regex::escape(c.encode_utf8(&mut [0; 4]));

        let token_re = format!(
            "{open}{sigil}([0-9]+){sep}([^{close}]*){close}",
            open = esc(config.token_open),
            sigil = esc(config.sigil),
            sep = esc(config.id_separator),
            close = esc(config.token_close),
        );
        // Any element of the mention tag whose text starts with the sigil,
        // with or without the class we render.
        let element_re = format!(
            r"(?i)<{tag}\b[^>]*>({sigil}[^<]*)</{tag}\s*>",
            tag = regex::escape(&config.mention_tag),
            sigil = esc(config.sigil),
        );

        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| AquiferError::InvalidSyntax(e.to_string()))
        };
        Ok(Self {
            token_re: compile(&token_re)?,
            element_re: compile(&element_re)?,
            config,
        })
    }

    /// The default `@` grammar with `{@id|name}` tokens.
    pub fn default_ref() -> &'static MentionSyntax {
        &DEFAULT_SYNTAX
    }

    pub fn config(&self) -> &SyntaxConfig {
        &self.config
    }

    pub fn sigil(&self) -> char {
        self.config.sigil
    }

    /// Chars allowed after the sigil while a mention is being typed.
    pub fn is_mention_char(&self, c: char) -> bool {
        c.is_alphabetic() || c == ' ' || c == '\u{a0}' || self.config.punctuation.contains(c)
    }

    /// Persisted tokens in plain text, in order.
    pub fn tokens<'a>(&self, text: &'a str) -> impl Iterator<Item = TokenMatch<'a>> {
        self.token_re.captures_iter(text).filter_map(|caps| {
            let whole = caps.get(0)?;
            let id = caps.get(1)?.as_str().parse::<u64>().ok().map(CandidateId);
            let cached_name = caps.get(2)?.as_str();
            Some(TokenMatch {
                range: whole.range(),
                id,
                cached_name,
            })
        })
    }

    /// Mention elements in markup, in order.
    pub fn elements<'a>(&self, markup: &'a str) -> impl Iterator<Item = ElementMatch<'a>> {
        self.element_re.captures_iter(markup).filter_map(|caps| {
            let whole = caps.get(0)?;
            let inner = caps.get(1)?;
            Some(ElementMatch {
                range: whole.range(),
                inner_range: inner.range(),
                inner: inner.as_str(),
            })
        })
    }

    /// Whether the text contains at least one persisted token.
    pub fn has_tokens(&self, text: &str) -> bool {
        self.token_re.is_match(text)
    }

    /// Persisted token for a candidate, e.g. `{@42|Jane Doe}`.
    ///
    /// The close marker cannot appear inside a token, so it is dropped from the name.
    pub fn render_token(&self, id: CandidateId, name: &str) -> String {
        let c = &self.config;
        let name: String = name.chars().filter(|ch| *ch != c.token_close).collect();
        format!(
            "{}{}{}{}{}{}",
            c.token_open, c.sigil, id, c.id_separator, name, c.token_close
        )
    }

    /// Display element for a name, e.g. `<span class="mention">@Jane Doe</span>`.
    pub fn render_element(&self, name: &str) -> String {
        let c = &self.config;
        let name = htmlize::escape_text(name);
        match &c.mention_class {
            Some(class) => format!(
                "<{tag} class=\"{class}\">{sigil}{name}</{tag}>",
                tag = c.mention_tag,
                sigil = c.sigil,
            ),
            None => format!("<{tag}>{sigil}{name}</{tag}>", tag = c.mention_tag, sigil = c.sigil),
        }
    }
}

impl Default for MentionSyntax {
    fn default() -> Self {
        DEFAULT_SYNTAX.clone()
    }
}
