//! Terminal confirmation prompt.

use std::io::{BufRead, BufReader, Stdin, Stderr, Write};
use std::path::Path;
use std::sync::Mutex;

use xfercheck_verify::ConfirmOracle;

/// Asks `Delete <path>? [y/N]` on `output` and reads the answer from `input`.
///
/// Only `y` or `yes` (any case) approves; anything else, including EOF and
/// read errors, declines.
pub struct PromptOracle<R, W> {
    io: Mutex<(R, W)>,
}

impl<R, W> PromptOracle<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            io: Mutex::new((input, output)),
        }
    }
}

impl PromptOracle<BufReader<Stdin>, Stderr> {
    /// Prompts on stderr and reads from stdin.
    pub fn terminal() -> Self {
        Self::new(BufReader::new(std::io::stdin()), std::io::stderr())
    }
}

impl<R, W> ConfirmOracle for PromptOracle<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    fn confirm(&self, path: &Path) -> bool {
        let mut io = self.io.lock().unwrap_or_else(|e| e.into_inner());
        let (input, output) = &mut *io;

        if write!(output, "Delete {}? [y/N] ", path.display())
            .and_then(|_| output.flush())
            .is_err()
        {
            return false;
        }

        let mut answer = String::new();
        match input.read_line(&mut answer) {
            Ok(0) | Err(_) => false,
            Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn ask(answer: &str) -> (bool, String) {
        let oracle = PromptOracle::new(Cursor::new(answer.as_bytes().to_vec()), Vec::new());
        let approved = oracle.confirm(Path::new("/srv/data/f2"));
        let (_, output) = oracle.io.into_inner().unwrap();
        (approved, String::from_utf8(output).unwrap())
    }

    #[test]
    fn yes_answers_approve() {
        assert!(ask("y\n").0);
        assert!(ask("YES\n").0);
        assert!(ask("  yes  \n").0);
    }

    #[test]
    fn other_answers_decline() {
        assert!(!ask("n\n").0);
        assert!(!ask("\n").0);
        assert!(!ask("yep\n").0);
        assert!(!ask("").0);
    }

    #[test]
    fn prompt_names_the_path() {
        let (_, output) = ask("n\n");
        assert_eq!(output, "Delete /srv/data/f2? [y/N] ");
    }

    #[test]
    fn answers_are_consumed_in_order() {
        let oracle = PromptOracle::new(Cursor::new(b"y\nn\n".to_vec()), Vec::new());
        assert!(oracle.confirm(Path::new("a")));
        assert!(!oracle.confirm(Path::new("b")));
        assert!(!oracle.confirm(Path::new("c")));
    }
}
