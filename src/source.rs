//! Per-script source text with an incremental line index
//!
//! Line offsets are resolved lazily and cached in an ordered map. A request
//! for line `n` scans forward from the nearest cached line at or below `n`,
//! caching every line it passes, so walking a script front to back scans its
//! text exactly once.

use std::collections::BTreeMap;

/// Source text of a loaded script
#[derive(Debug)]
pub struct ScriptSource {
    text: String,
    file_name: String,
    base_line: u32,
    /// Line number -> byte offset of the line start; `None` marks the first
    /// line past the end of the text
    line_offsets: BTreeMap<u32, Option<usize>>,
    /// Bytes examined while resolving offsets
    scanned_bytes: usize,
}

impl ScriptSource {
    pub fn new(text: &str, file_name: &str, base_line: u32) -> Self {
        Self {
            text: text.to_string(),
            file_name: file_name.to_string(),
            base_line,
            line_offsets: BTreeMap::new(),
            scanned_bytes: 0,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Line number of the first line of the text
    pub fn base_line(&self) -> u32 {
        self.base_line
    }

    /// Total bytes examined by line resolution so far
    pub fn scanned_bytes(&self) -> usize {
        self.scanned_bytes
    }

    /// Text of `line` without its terminator, or `None` past the end of the text
    pub fn line_text(&mut self, line: u32) -> Option<&str> {
        let start = self.line_offset(line)?;
        let end = line
            .checked_add(1)
            .and_then(|next| self.line_offset(next))
            .unwrap_or(self.text.len());
        let text = &self.text[start..end];
        let text = text.strip_suffix('\n').unwrap_or(text);
        Some(text.strip_suffix('\r').unwrap_or(text))
    }

    fn line_offset(&mut self, line: u32) -> Option<usize> {
        if let Some(&offset) = self.line_offsets.get(&line) {
            return offset;
        }
        if line < self.base_line || self.text.is_empty() {
            return None;
        }

        let (mut current, mut offset) = match self.line_offsets.range(..line).next_back() {
            Some((&cached_line, &cached_offset)) => (cached_line, cached_offset),
            None => {
                self.line_offsets.insert(self.base_line, Some(0));
                (self.base_line, Some(0))
            }
        };

        while current < line {
            let Some(start) = offset else { break };
            offset = self.next_line_start(start);
            current += 1;
            self.line_offsets.insert(current, offset);
        }

        if current < line {
            // Ran out of text; everything past `current` is unresolved too
            self.line_offsets.insert(line, None);
            return None;
        }
        offset
    }

    /// Offset of the line following the one starting at `start`
    fn next_line_start(&mut self, start: usize) -> Option<usize> {
        let rest = &self.text[start..];
        match rest.find('\n') {
            Some(pos) => {
                self.scanned_bytes += pos + 1;
                let next = start + pos + 1;
                (next < self.text.len()).then_some(next)
            }
            None => {
                self.scanned_bytes += rest.len();
                None
            }
        }
    }
}
