//! The minimal integer-stream interface the simulator and interpreter read
//! lookahead symbols through. Token streams (and, for the lexer side, char
//! streams) are external collaborators that implement this trait; this crate
//! never constructs one itself.

/// No more input.
pub const EOF: isize = -1;
/// The smallest token type a grammar may define; types below this are
/// reserved by the runtime.
pub const MIN_USER_TOKEN_TYPE: isize = 1;
/// Internal marker for an epsilon transition; never returned by `LA`.
pub const EPSILON: isize = -2;
/// A token type that has not been assigned; distinct from `EOF`.
pub const INVALID_TYPE: isize = 0;

/// A resettable, markable stream of integers (token types or, for a lexer,
/// character codes). `LA`/`consume`/`mark`/`seek`/`release` mirror the four
/// operations `adaptivePredict` needs: look ahead without consuming, advance,
/// and snapshot/restore position around a speculative simulation.
pub trait IntStream {
    /// Consume the current symbol; the stream must not be at `EOF`.
    fn consume(&mut self);

    /// 1-based lookahead. `la(1)` is the current symbol, `la(-1)` the
    /// previous one. Returns `EOF` past the end of input.
    fn la(&mut self, i: isize) -> isize;

    /// Take a speculative marker at the current position. Markers nest;
    /// release them in LIFO order via [`IntStream::release`].
    fn mark(&mut self) -> isize;

    /// Release a marker obtained from [`IntStream::mark`].
    fn release(&mut self, marker: isize);

    /// Current absolute index of the next symbol to be consumed.
    fn index(&self) -> isize;

    /// Reposition the stream. `index` must have been visited before (no
    /// seeking past what has been buffered for a non-resettable source).
    fn seek(&mut self, index: isize);

    /// Total number of symbols in the stream, if known.
    fn size(&self) -> isize;

    /// A name for diagnostics (file name, "<string>", ...).
    fn get_source_name(&self) -> String;
}

/// RAII guard around a speculative `mark`/`seek`/`release` triple so that any
/// early return (including `?`-propagated errors) still restores the input
/// stream to the position it had when the guard was created.
pub struct InputMark<'a, T: IntStream + ?Sized> {
    stream: &'a mut T,
    entry_index: isize,
    marker: isize,
    released: bool,
}

impl<'a, T: IntStream + ?Sized> InputMark<'a, T> {
    pub fn new(stream: &'a mut T) -> Self {
        let entry_index = stream.index();
        let marker = stream.mark();
        InputMark { stream, entry_index, marker, released: false }
    }

    pub fn stream(&mut self) -> &mut T {
        self.stream
    }

    /// Explicitly restore and release. Called automatically on drop if the
    /// caller never calls it themselves.
    pub fn restore(&mut self) {
        if !self.released {
            self.stream.seek(self.entry_index);
            self.stream.release(self.marker);
            self.released = true;
        }
    }
}

impl<'a, T: IntStream + ?Sized> Drop for InputMark<'a, T> {
    fn drop(&mut self) {
        self.restore();
    }
}
