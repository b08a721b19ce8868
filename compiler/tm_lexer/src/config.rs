//! Session configuration.

/// Default number of repeats tolerated by each loop guard.
pub const DEFAULT_LOOP_BOUND: usize = 10;

/// Knobs for a [`Lexer`](crate::Lexer) session.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LexerConfig {
    /// Lines longer than this many bytes are only scanned up to the limit
    /// (rounded down to a character boundary); the rest of the line becomes
    /// one token in the scope active at the cut.
    pub line_limit: Option<usize>,
    /// How many times a loop guard may see the same parse state before it
    /// forces the rest of the line out as a single token.
    pub loop_bound: usize,
}

impl Default for LexerConfig {
    fn default() -> Self {
        LexerConfig {
            line_limit: None,
            loop_bound: DEFAULT_LOOP_BOUND,
        }
    }
}

impl LexerConfig {
    pub const LINE_LIMIT_VAR: &'static str = "TM_LEXER_LINE_LIMIT";
    pub const LOOP_BOUND_VAR: &'static str = "TM_LEXER_LOOP_BOUND";

    /// Defaults, overridden by `TM_LEXER_LINE_LIMIT` and `TM_LEXER_LOOP_BOUND`.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = LexerConfig::default();
        if let Some(limit) = parse_var(&lookup, Self::LINE_LIMIT_VAR) {
            config.line_limit = Some(limit);
        }
        if let Some(bound) = parse_var(&lookup, Self::LOOP_BOUND_VAR) {
            config.loop_bound = bound;
        }
        config
    }

    #[must_use]
    pub fn with_line_limit(mut self, line_limit: Option<usize>) -> Self {
        self.line_limit = line_limit;
        self
    }

    #[must_use]
    pub fn with_loop_bound(mut self, loop_bound: usize) -> Self {
        self.loop_bound = loop_bound;
        self
    }
}

fn parse_var(lookup: &impl Fn(&str) -> Option<String>, var: &str) -> Option<usize> {
    let raw = lookup(var)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(var, value = %raw, %err, "ignoring invalid lexer setting");
            None
        }
    }
}
