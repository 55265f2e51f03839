//! Read-name generation with a process-global monotonic counter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// How the variable tail of a read name is composed. Chosen once from the
/// run configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadNameMode {
    CounterOnly,
    SePosition,
    PePosition,
}

/// Shared state every per-thread [`ReadNameGenerator`] clone draws its
/// counter value from. Lock-free: a single `fetch_add`.
struct Shared {
    counter: AtomicU64,
}

/// Builds read names of the form `<tool>:chr<mark>[:<pos-info>].<counter>`.
///
/// Not `Sync` by convention: the internal formatting buffer is reused
/// across calls without a lock, so one instance must be owned by a single
/// worker thread. Sharing one instance across threads is a logic error,
/// not a data race the type system prevents — see the single-thread-per-
/// clone contract documented in the design notes. Only the counter itself
/// is shared, via [`Shared`]/`Arc`.
pub struct ReadNameGenerator {
    tool: String,
    mode: ReadNameMode,
    shared: Arc<Shared>,
    buf: String,
    chrom_mark: String,
}

impl ReadNameGenerator {
    pub fn new(tool: impl Into<String>, mode: ReadNameMode) -> Self {
        Self {
            tool: tool.into(),
            mode,
            shared: Arc::new(Shared {
                counter: AtomicU64::new(0),
            }),
            buf: String::with_capacity(64),
            chrom_mark: String::new(),
        }
    }

    /// Returns a clone sharing the same global counter, for use on another
    /// worker thread.
    pub fn clone_shared(&self) -> Self {
        Self {
            tool: self.tool.clone(),
            mode: self.mode,
            shared: Arc::clone(&self.shared),
            buf: String::with_capacity(64),
            chrom_mark: String::new(),
        }
    }

    pub fn set_chrom(&mut self, mark: &str) {
        self.chrom_mark.clear();
        self.chrom_mark.push_str(mark);
    }

    /// Allocates the next counter value and formats a complete name for a
    /// fragment spanning `[start, end)`. Both mates of a PE pair must call
    /// this once (shared value) and append their own `/1`/`/2` suffix
    /// downstream.
    pub fn next_name(&mut self, start: u32, end: u32) -> &str {
        let counter = self.shared.counter.fetch_add(1, Ordering::Relaxed) + 1;
        self.buf.clear();
        self.buf.push_str(&self.tool);
        self.buf.push_str(":chr");
        self.buf.push_str(&self.chrom_mark);
        match self.mode {
            ReadNameMode::CounterOnly => {}
            ReadNameMode::SePosition => {
                self.buf.push(':');
                self.buf.push_str(itoa::Buffer::new().format(start));
            }
            ReadNameMode::PePosition => {
                self.buf.push(':');
                self.buf.push_str(itoa::Buffer::new().format(start));
                self.buf.push('-');
                self.buf.push_str(itoa::Buffer::new().format(end));
            }
        }
        self.buf.push('.');
        self.buf.push_str(itoa::Buffer::new().format(counter));
        &self.buf
    }

    /// Current counter value without allocating a new one (for tests and
    /// monotonicity checks).
    pub fn counter(&self) -> u64 {
        self.shared.counter.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_only_mode_omits_position() {
        let mut gen = ReadNameGenerator::new("sim", ReadNameMode::CounterOnly);
        gen.set_chrom("1");
        assert_eq!(gen.next_name(100, 150), "sim:chr1.1");
        assert_eq!(gen.next_name(200, 250), "sim:chr1.2");
    }

    #[test]
    fn pe_position_mode_includes_span() {
        let mut gen = ReadNameGenerator::new("sim", ReadNameMode::PePosition);
        gen.set_chrom("X");
        assert_eq!(gen.next_name(500, 600), "sim:chrX:500-600.1");
    }

    #[test]
    fn shared_clones_draw_from_one_counter() {
        let mut a = ReadNameGenerator::new("sim", ReadNameMode::CounterOnly);
        a.set_chrom("1");
        let mut b = a.clone_shared();
        b.set_chrom("2");
        assert_eq!(a.next_name(0, 0), "sim:chr1.1");
        assert_eq!(b.next_name(0, 0), "sim:chr2.2");
        assert_eq!(a.next_name(0, 0), "sim:chr1.3");
    }
}
