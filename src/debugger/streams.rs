//! Injectable input/output/error streams
//!
//! The command loop only ever talks to these three streams. They default to
//! the process's standard streams; redirecting them is how an embedder puts
//! the debugger behind some other transport.

use std::cell::RefCell;
use std::io::{self, BufRead, BufReader, Write};
use std::rc::Rc;

/// The three text streams used by a debugger instance
pub struct Streams {
    pub(crate) input: Box<dyn BufRead>,
    pub(crate) output: Box<dyn Write>,
    pub(crate) error: Box<dyn Write>,
}

impl Default for Streams {
    fn default() -> Self {
        Self::stdio()
    }
}

impl Streams {
    /// Streams bound to stdin/stdout/stderr
    pub fn stdio() -> Self {
        Self {
            input: Box::new(BufReader::new(io::stdin())),
            output: Box::new(io::stdout()),
            error: Box::new(io::stderr()),
        }
    }

    /// Read one line without its terminator
    ///
    /// `None` at end of input. A read failure is reported on the error
    /// stream and also ends input.
    pub fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => {
                let trimmed = line.trim_end_matches(['\n', '\r']).len();
                line.truncate(trimmed);
                Some(line)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read debugger input");
                self.error_message(&format!("Cannot read debugger input: {e}"));
                None
            }
        }
    }

    /// Write text to the output stream without a newline
    pub fn output(&mut self, text: &str) {
        write_flushed(&mut self.output, text, false);
    }

    /// Write a line to the output stream
    pub fn message(&mut self, text: &str) {
        write_flushed(&mut self.output, text, true);
    }

    /// Write a line to the error stream
    pub fn error_message(&mut self, text: &str) {
        write_flushed(&mut self.error, text, true);
    }
}

fn write_flushed(stream: &mut dyn Write, text: &str, newline: bool) {
    fn write(stream: &mut dyn Write, text: &str, newline: bool) -> io::Result<()> {
        stream.write_all(text.as_bytes())?;
        if newline {
            stream.write_all(b"\n")?;
        }
        stream.flush()
    }

    if let Err(e) = write(stream, text, newline) {
        tracing::warn!(error = %e, "Failed to write debugger output");
    }
}

/// In-memory writer whose contents stay readable after being handed out
///
/// Cloning shares the buffer, so one clone can be given to the debugger as a
/// stream while another is kept to inspect what was written.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
