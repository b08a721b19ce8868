//! Lexing sessions.

use std::sync::{Arc, OnceLock};

use tm_ir::{Frame, FrameStack, Grammar, ScopePath, Token};
use tm_regex::{CancellationToken, RegexCache, RegexEngine};
use tm_selector::{CachingWeigher, ScopeSelectorWeigher, SelectorWeigher};

use crate::cache::MatchCache;
use crate::config::LexerConfig;
use crate::error::LexError;
use crate::matcher::RuleMatcher;
use crate::scanner::LineScanner;

/// Parse state between two lines: the open regions and the scope path they
/// produced.
///
/// Cheap to clone. Saving the state observed before a line and passing it
/// to [`Lexer::init`] later resumes lexing at that line with identical
/// results.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LexState {
    pub frames: FrameStack,
    pub scope: ScopePath,
}

impl LexState {
    /// State at the start of a document: only the root frame and scope.
    pub fn initial(grammar: &Grammar) -> Self {
        LexState {
            frames: FrameStack::new(Frame::not_matched(grammar.root())),
            scope: ScopePath::root(grammar.scope_name()),
        }
    }
}

fn shared_weigher() -> Arc<dyn SelectorWeigher> {
    static SHARED: OnceLock<Arc<CachingWeigher<ScopeSelectorWeigher>>> = OnceLock::new();
    let weigher = SHARED.get_or_init(|| Arc::new(CachingWeigher::new(ScopeSelectorWeigher)));
    Arc::clone(weigher) as Arc<dyn SelectorWeigher>
}

/// A single-owner lexing session over one text.
///
/// ```text
/// let mut lexer = Lexer::new(grammar, LexerConfig::default());
/// lexer.init(text, 0, None)?;
/// let tokens = lexer.tokenize_to_end(&CancellationToken::new())?;
/// ```
pub struct Lexer {
    grammar: Arc<Grammar>,
    config: LexerConfig,
    regex: Arc<dyn RegexEngine>,
    weigher: Arc<dyn SelectorWeigher>,
    cache: Arc<MatchCache>,
    text: Arc<str>,
    scanner: LineScanner,
}

impl Lexer {
    /// A session using the process-wide regex engine, selector weigher and
    /// match cache, positioned at the start of an empty text.
    pub fn new(grammar: Arc<Grammar>, config: LexerConfig) -> Self {
        let scanner = LineScanner::new(LexState::initial(&grammar), 0, config.loop_bound);
        Lexer {
            grammar,
            config,
            regex: RegexCache::shared(),
            weigher: shared_weigher(),
            cache: MatchCache::shared(),
            text: Arc::from(""),
            scanner,
        }
    }

    #[must_use]
    pub fn with_regex_engine(mut self, regex: Arc<dyn RegexEngine>) -> Self {
        self.regex = regex;
        self
    }

    #[must_use]
    pub fn with_selector_weigher(mut self, weigher: Arc<dyn SelectorWeigher>) -> Self {
        self.weigher = weigher;
        self
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<MatchCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Start lexing `text` at `start_offset`.
    ///
    /// `start_offset` should be a line start, and `saved` the state
    /// captured there by an earlier session; `None` starts from
    /// [`LexState::initial`].
    ///
    /// # Errors
    /// [`LexError::UnknownRule`] if `saved` holds a frame whose rule is not
    /// in this session's grammar. The session is left unchanged.
    pub fn init(
        &mut self,
        text: impl Into<Arc<str>>,
        start_offset: usize,
        saved: Option<LexState>,
    ) -> Result<(), LexError> {
        let state = match saved {
            Some(state) => {
                if let Some(frame) = state.frames.iter().find(|f| self.grammar.get(f.rule).is_none()) {
                    return Err(LexError::UnknownRule(frame.rule));
                }
                state
            }
            None => LexState::initial(&self.grammar),
        };
        self.text = text.into();
        self.scanner = LineScanner::new(state, start_offset, self.config.loop_bound);
        Ok(())
    }

    /// Lex from the current offset through the next `\n` (or the end of the
    /// text), appending tokens to `out`.
    ///
    /// On success the offset is at the end of that line and the emitted
    /// tokens cover it without gaps. Does nothing once the text is finished.
    ///
    /// # Errors
    /// - [`LexError::InvalidPattern`] if a grammar pattern does not compile
    /// - [`LexError::Cancelled`] if `cancel` fired
    /// - [`LexError::OffsetNotOnCharBoundary`] if the session was started
    ///   inside a character
    ///
    /// After an error the session should be re-initialized from a saved
    /// state.
    pub fn advance_line(
        &mut self,
        out: &mut Vec<Token>,
        cancel: &CancellationToken,
    ) -> Result<(), LexError> {
        let text = Arc::clone(&self.text);
        let start = self.scanner.offset();
        if start >= text.len() {
            return Ok(());
        }
        let end = memchr::memchr(b'\n', &text.as_bytes()[start..]).map_or(text.len(), |i| start + i + 1);
        let line = text
            .get(start..end)
            .ok_or(LexError::OffsetNotOnCharBoundary(start))?;

        let matcher = RuleMatcher::new(
            &self.grammar,
            &*self.regex,
            &*self.weigher,
            &self.cache,
            cancel,
        );
        let scanned = match self.config.line_limit {
            Some(limit) if line.len() > limit => {
                let cut = floor_char_boundary(line, limit);
                tracing::debug!(line_start = start, len = line.len(), limit, "line exceeds limit, scanning prefix only");
                &line[..cut]
            }
            _ => line,
        };
        self.scanner.parse_line(&matcher, scanned, start, out)?;
        self.scanner.add_token(out, end);
        Ok(())
    }

    /// Lex every remaining line.
    ///
    /// # Errors
    /// As [`Lexer::advance_line`].
    pub fn tokenize_to_end(&mut self, cancel: &CancellationToken) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        while !self.is_finished() {
            self.advance_line(&mut tokens, cancel)?;
        }
        Ok(tokens)
    }

    /// Document offset up to which tokens have been produced.
    pub fn current_offset(&self) -> usize {
        self.scanner.offset()
    }

    pub fn is_finished(&self) -> bool {
        self.scanner.offset() >= self.text.len()
    }

    /// Parse state at the current offset.
    pub fn state(&self) -> &LexState {
        self.scanner.state()
    }

    /// Owned copy of [`Lexer::state`], for handing to a later session.
    pub fn snapshot(&self) -> LexState {
        self.scanner.state().clone()
    }

    pub fn grammar(&self) -> &Arc<Grammar> {
        &self.grammar
    }

    pub fn config(&self) -> &LexerConfig {
        &self.config
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl std::fmt::Debug for Lexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lexer")
            .field("grammar", &self.grammar.scope_name())
            .field("config", &self.config)
            .field("offset", &self.scanner.offset())
            .field("text_len", &self.text.len())
            .finish_non_exhaustive()
    }
}

/// Largest character boundary of `text` not past `limit`.
fn floor_char_boundary(text: &str, limit: usize) -> usize {
    let mut cut = limit.min(text.len());
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    cut
}
