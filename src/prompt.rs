//! Line-oriented interactive questions.
//!
//! Questions are asked in an explicit retry loop: invalid answers are
//! reported and the question is repeated, while end of input or a set
//! [`CancelToken`] ends the loop with [`Error::Cancelled`].

use crate::cancel::CancelToken;
use crate::{Error, Result};
use std::io::{self, BufRead, BufReader, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// Source of answers to interactive questions.
pub trait Prompt {
    /// Shows `question` and returns the answer line, or `None` at end of input.
    fn ask(&mut self, question: &str) -> Result<Option<String>>;
}

/// How often a waiting question checks for cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Asks questions on a writer and reads answers line by line from a reader.
///
/// The reader runs on its own thread once the first question is asked, so a
/// pending question returns [`Error::Cancelled`] as soon as the token is set
/// instead of waiting for input.
pub struct LinePrompt<R, W> {
    reader: Option<R>,
    lines: Option<Receiver<io::Result<String>>>,
    writer: W,
    cancel: CancelToken,
}

impl<R, W> LinePrompt<R, W>
where
    R: BufRead + Send + 'static,
    W: Write,
{
    pub fn new(reader: R, writer: W, cancel: CancelToken) -> Self {
        Self {
            reader: Some(reader),
            lines: None,
            writer,
            cancel,
        }
    }
}

/// A prompt on the process's standard input and error streams.
pub fn stdio(cancel: CancelToken) -> LinePrompt<BufReader<io::Stdin>, io::Stderr> {
    LinePrompt::new(BufReader::new(io::stdin()), io::stderr(), cancel)
}

fn spawn_reader<R: BufRead + Send + 'static>(reader: R) -> Receiver<io::Result<String>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in reader.lines() {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

impl<R, W> Prompt for LinePrompt<R, W>
where
    R: BufRead + Send + 'static,
    W: Write,
{
    fn ask(&mut self, question: &str) -> Result<Option<String>> {
        write!(self.writer, "{question}")?;
        self.writer.flush()?;
        if let Some(reader) = self.reader.take() {
            self.lines = Some(spawn_reader(reader));
        }
        let Some(lines) = &self.lines else {
            return Ok(None);
        };
        loop {
            match lines.recv_timeout(POLL_INTERVAL) {
                Ok(line) => return Ok(Some(line?.trim().to_string())),
                Err(RecvTimeoutError::Timeout) => {
                    if self.cancel.is_cancelled() {
                        writeln!(self.writer)?;
                        return Err(Error::Cancelled);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    writeln!(self.writer)?;
                    return Ok(None);
                }
            }
        }
    }
}

/// Asks until `parse` accepts the answer.
///
/// `parse` returns the error message shown before asking again.
pub fn ask_until<T, F>(
    prompt: &mut dyn Prompt,
    cancel: &CancelToken,
    question: &str,
    mut parse: F,
) -> Result<T>
where
    F: FnMut(&str) -> std::result::Result<T, String>,
{
    loop {
        cancel.check()?;
        let answer = prompt.ask(question)?.ok_or(Error::Cancelled)?;
        cancel.check()?;
        match parse(&answer) {
            Ok(value) => return Ok(value),
            Err(message) => eprintln!("{message}"),
        }
    }
}

/// Asks a yes/no question.
pub fn confirm(prompt: &mut dyn Prompt, cancel: &CancelToken, question: &str) -> Result<bool> {
    let question = format!("{question} (y/n): ");
    ask_until(prompt, cancel, &question, |answer| {
        match answer.to_ascii_lowercase().as_str() {
            "y" | "yes" => Ok(true),
            "n" | "no" => Ok(false),
            _ => Err("Please answer 'y' or 'n'.".to_string()),
        }
    })
}

/// A prompt answering from a fixed script, for tests.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: std::collections::VecDeque<String>,
    /// Every question asked so far.
    pub questions: Vec<String>,
}

impl ScriptedPrompt {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            questions: vec![],
        }
    }
}

impl Prompt for ScriptedPrompt {
    fn ask(&mut self, question: &str) -> Result<Option<String>> {
        self.questions.push(question.to_string());
        Ok(self.answers.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_prompt_reads_trimmed_lines() {
        let input = b"  hello \n".as_slice();
        let mut output = Vec::new();
        let mut prompt = LinePrompt::new(input, &mut output, CancelToken::new());
        assert_eq!(prompt.ask("Name: ").unwrap(), Some("hello".to_string()));
        assert_eq!(prompt.ask("Again: ").unwrap(), None);
        drop(prompt);
        assert!(String::from_utf8(output).unwrap().starts_with("Name: Again: "));
    }

    #[test]
    fn test_waiting_question_stops_on_cancel() {
        let (reader, _writer) = io::pipe().unwrap();
        let cancel = CancelToken::new();
        let mut prompt = LinePrompt::new(BufReader::new(reader), io::sink(), cancel.clone());
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            cancel.cancel();
        });

        let result = prompt.ask("Overwrite? (y/n): ");

        canceller.join().unwrap();
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[test]
    fn test_confirm_retries_until_valid() {
        let mut prompt = ScriptedPrompt::new(["maybe", "", "Y"]);
        let answer = confirm(&mut prompt, &CancelToken::new(), "Overwrite?").unwrap();
        assert!(answer);
        assert_eq!(prompt.questions.len(), 3);
        assert_eq!(prompt.questions[0], "Overwrite? (y/n): ");
    }

    #[test]
    fn test_confirm_no() {
        let mut prompt = ScriptedPrompt::new(["no"]);
        assert!(!confirm(&mut prompt, &CancelToken::new(), "Overwrite?").unwrap());
    }

    #[test]
    fn test_end_of_input_cancels() {
        let mut prompt = ScriptedPrompt::new(["bad"]);
        let result = confirm(&mut prompt, &CancelToken::new(), "Overwrite?");
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[test]
    fn test_cancelled_token_stops_before_asking() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut prompt = ScriptedPrompt::new(["y"]);
        assert!(matches!(
            confirm(&mut prompt, &cancel, "Overwrite?"),
            Err(Error::Cancelled)
        ));
        assert!(prompt.questions.is_empty());
    }

    #[test]
    fn test_ask_until_parses() {
        let mut prompt = ScriptedPrompt::new(["x", "42"]);
        let value: u32 = ask_until(&mut prompt, &CancelToken::new(), "Number: ", |a| {
            a.parse().map_err(|_| format!("'{a}' is not a number"))
        })
        .unwrap();
        assert_eq!(value, 42);
    }
}
