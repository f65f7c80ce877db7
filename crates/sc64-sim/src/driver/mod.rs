//! Session driver: parse a script and run it on a fresh board

use crate::board::{Board, BoardConfig};
use crate::common::SimResult;
use crate::link::{Link, DEFAULT_MAX_TICKS};
use crate::script::{Lexer, Parser, RunSummary, Runner, Token};

/// Options for one session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub board: BoardConfig,
    /// Tick budget for every wait on the link
    pub max_ticks: u64,
    pub dump_tokens: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            board: BoardConfig::default(),
            max_ticks: DEFAULT_MAX_TICKS,
            dump_tokens: false,
        }
    }
}

pub struct Session {
    config: SessionConfig,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn tokens(&self, source: &str) -> SimResult<Vec<Token>> {
        Lexer::new(source).tokenize_all()
    }

    /// Run `source` to completion, or until the first failing step.
    pub fn run(&self, source: &str) -> SimResult<RunSummary> {
        if self.config.dump_tokens {
            let tokens = self.tokens(source)?;
            eprintln!("=== Tokens ===");
            for token in &tokens {
                eprintln!("{:?}", token);
            }
            eprintln!("=== End Tokens ===\n");
        }

        let script = Parser::new(source)?.parse()?;
        log::debug!("parsed {} steps", script.steps.len());

        let mut board = Board::new(self.config.board);
        let mut link = Link::with_max_ticks(&mut board, self.config.max_ticks);
        Runner::new(&mut link).run(&script)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}
