// Operator console
//
// Line-oriented: one command or answer per input line, one result per output line.

use async_trait::async_trait;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::warn;

#[async_trait]
pub trait Console: Send {
    /// Next input line without its terminator; `None` once input has ended
    async fn read_line(&mut self) -> Option<String>;

    /// Write one line of output
    fn say(&mut self, line: &str);
}

/// Console on the process's stdin/stdout
pub struct StdConsole {
    lines: Lines<BufReader<Stdin>>,
}

impl StdConsole {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for StdConsole {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Console for StdConsole {
    async fn read_line(&mut self) -> Option<String> {
        match self.lines.next_line().await {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to read operator input: {}", e);
                None
            }
        }
    }

    fn say(&mut self, line: &str) {
        let mut stdout = std::io::stdout().lock();
        // A closed stdout leaves nothing useful to report to
        let _ = writeln!(stdout, "{}", line).and_then(|_| stdout.flush());
    }
}
