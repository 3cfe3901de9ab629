//! Console visualiser: renders a scanner tree as tab-indented lines, one
//! symbol per state, with each scanner's logs printed beneath it.

use crate::models::{Log, Scanner, State, Visualiser};

/// The strings rendered for each state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbols {
    pub passing: String,
    pub failing: String,
    pub unknown: String,
}

impl Symbols {
    pub fn new(
        passing: impl Into<String>,
        failing: impl Into<String>,
        unknown: impl Into<String>,
    ) -> Self {
        Self {
            passing: passing.into(),
            failing: failing.into(),
            unknown: unknown.into(),
        }
    }

    /// The state words themselves.
    pub fn words() -> Self {
        Self::new(
            State::Passing.as_str(),
            State::Failing.as_str(),
            State::Unknown.as_str(),
        )
    }

    pub fn emoji() -> Self {
        Self::new("✅", "❌", "❔")
    }

    fn for_state(&self, state: State) -> &str {
        match state {
            State::Passing => &self.passing,
            State::Failing => &self.failing,
            State::Unknown => &self.unknown,
        }
    }
}

impl Default for Symbols {
    fn default() -> Self {
        Self::words()
    }
}

/// Which subtrees to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Show {
    #[default]
    All,
    OnlyFailing,
}

/// Visualise a service to the console.
#[derive(Debug, Clone, Default)]
pub struct ConsoleVisualiser {
    pub symbols: Symbols,
    pub show: Show,
}

impl ConsoleVisualiser {
    pub fn new(symbols: Symbols, show: Show) -> Self {
        Self { symbols, show }
    }

    fn visualise_log(log: &Log, indent: usize) -> String {
        format!("{}- {}: {}", "\t".repeat(indent), log.severity, log.message)
    }

    fn visualise_scanner(&self, scanner: &dyn Scanner, indent: usize) -> Vec<String> {
        let status = scanner.status();
        if self.show == Show::OnlyFailing && status.state == State::Passing {
            return Vec::new();
        }

        let tabs = "\t".repeat(indent);
        let mut lines = vec![format!(
            "{tabs}{} : {}",
            self.symbols.for_state(status.state),
            scanner.name()
        )];
        lines.extend(
            status
                .messages
                .iter()
                .map(|log| Self::visualise_log(log, indent)),
        );
        for child in scanner.children() {
            lines.extend(self.visualise_scanner(child.as_ref(), indent + 1));
        }
        lines
    }
}

impl Visualiser for ConsoleVisualiser {
    fn visualise(&self, service: &dyn Scanner) -> String {
        self.visualise_scanner(service, 0).join("\n") + "\n"
    }
}
