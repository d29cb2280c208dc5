//! I/O ports.
//!
//! The engine talks to the outside world through two single-value channels:
//! an [`InputPort`] it asks for the next word, and an [`OutputPort`] it hands
//! each emitted word to. An input port answering `None` means "not yet
//! available"; the engine then suspends *before* consuming anything, so a
//! driver can poll a port repeatedly without losing values.

use std::collections::VecDeque;

use crate::error::IncompleteOutputGroup;

/// Source of input words
pub trait InputPort {
    /// Next word, or `None` when nothing is available right now.
    fn next_input(&mut self) -> Option<i64>;
}

/// Sink for output words
pub trait OutputPort {
    fn offer(&mut self, value: i64);
}

/// Queued mode: values are consumed front to back.
impl InputPort for VecDeque<i64> {
    fn next_input(&mut self) -> Option<i64> {
        self.pop_front()
    }
}

impl OutputPort for VecDeque<i64> {
    fn offer(&mut self, value: i64) {
        self.push_back(value);
    }
}

impl OutputPort for Vec<i64> {
    fn offer(&mut self, value: i64) {
        self.push(value);
    }
}

impl<T: InputPort + ?Sized> InputPort for &mut T {
    fn next_input(&mut self) -> Option<i64> {
        (**self).next_input()
    }
}

impl<T: OutputPort + ?Sized> OutputPort for &mut T {
    fn offer(&mut self, value: i64) {
        (**self).offer(value);
    }
}

/// Answers every input request with the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingleValue(pub i64);

impl InputPort for SingleValue {
    fn next_input(&mut self) -> Option<i64> {
        Some(self.0)
    }
}

/// Never has input. For programs that are not expected to read.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInput;

impl InputPort for NoInput {
    fn next_input(&mut self) -> Option<i64> {
        None
    }
}

/// Drops every output.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl OutputPort for Discard {
    fn offer(&mut self, _value: i64) {}
}

/// Adapts a closure into an [`InputPort`].
pub struct InputFn<F>(pub F);

impl<F: FnMut() -> Option<i64>> InputPort for InputFn<F> {
    fn next_input(&mut self) -> Option<i64> {
        (self.0)()
    }
}

/// Adapts a closure into an [`OutputPort`].
pub struct OutputFn<F>(pub F);

impl<F: FnMut(i64)> OutputPort for OutputFn<F> {
    fn offer(&mut self, value: i64) {
        (self.0)(value)
    }
}

/// Feeds text to ASCII-speaking programs, one character code per read.
///
/// Each line pushed is terminated with `\n`, which is how such programs
/// recognise the end of a command.
#[derive(Debug, Clone, Default)]
pub struct AsciiInput {
    pending: VecDeque<i64>,
}

impl AsciiInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a list of command lines.
    pub fn from_lines<S: AsRef<str>>(lines: impl IntoIterator<Item = S>) -> Self {
        let mut input = Self::new();
        for line in lines {
            input.push_line(line.as_ref());
        }
        input
    }

    pub fn push_line(&mut self, line: &str) {
        self.pending.extend(line.bytes().map(i64::from));
        self.pending.push_back(i64::from(b'\n'));
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl InputPort for AsciiInput {
    fn next_input(&mut self) -> Option<i64> {
        self.pending.pop_front()
    }
}

/// Collects ASCII output as text.
///
/// Words outside the ASCII range cannot be rendered and are kept aside in
/// [`AsciiOutput::values`]; programs commonly report a final numeric answer
/// that way.
#[derive(Debug, Clone, Default)]
pub struct AsciiOutput {
    text: String,
    values: Vec<i64>,
}

impl AsciiOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn values(&self) -> &[i64] {
        &self.values
    }
}

impl OutputPort for AsciiOutput {
    fn offer(&mut self, value: i64) {
        match u8::try_from(value) {
            Ok(byte) if byte.is_ascii() => self.text.push(char::from(byte)),
            _ => self.values.push(value),
        }
    }
}

/// Split a flat output stream into fixed-size groups.
pub fn group_outputs<const N: usize>(values: &[i64]) -> Result<Vec<[i64; N]>, IncompleteOutputGroup> {
    let chunks = values.chunks_exact(N);
    let trailing = chunks.remainder();
    if !trailing.is_empty() {
        return Err(IncompleteOutputGroup {
            group_size: N,
            trailing: trailing.to_vec(),
        });
    }

    Ok(chunks
        .map(|chunk| {
            let mut group = [0; N];
            group.copy_from_slice(chunk);
            group
        })
        .collect())
}
