use std::io::{self, BufRead, Write};

use crate::error::ExportResult;

/// Blocking yes/no confirmation, injected so the flow stays testable
/// without a terminal.
pub trait Prompt {
    fn confirm(&self, message: &str) -> ExportResult<bool>;
}

/// Only a plain `y` or `Y` answer proceeds; anything else declines.
pub fn is_affirmative(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("y")
}

/// Reads the operator's answer from stdin. There is no timeout; the run
/// blocks until a line arrives.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn confirm(&self, message: &str) -> ExportResult<bool> {
        let mut stdout = io::stdout();
        write!(stdout, "{message} [y/N] ")?;
        stdout.flush()?;

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(is_affirmative(&answer))
    }
}

#[cfg(test)]
mod tests {
    use super::is_affirmative;

    #[test]
    fn only_y_confirms() {
        assert!(is_affirmative("y"));
        assert!(is_affirmative("Y"));
        assert!(is_affirmative(" y\n"));

        assert!(!is_affirmative("yes"));
        assert!(!is_affirmative("n"));
        assert!(!is_affirmative(""));
        assert!(!is_affirmative("Y es"));
    }
}
