/// Minimum cumulative partial length before the streamed text locks.
const LOCK_MIN_LEN: usize = 50;
/// A replacement candidate must be at least this long...
const REPLACE_FLOOR: usize = 500;
/// ...and more than this many times the locked text's length.
const REPLACE_RATIO: usize = 2;

/// Endings that mark a candidate as cut off mid-thought.
const DANGLING_CONNECTIVES: [&str; 4] = ["Based on", "Let me", "The", "Looking at"];

/// Decides whether newly available text may replace already-delivered text.
///
/// Once streamed partial text locks, a later finalized answer only wins if it
/// is simultaneously much longer (> 2x), above an absolute floor, and does
/// not itself end mid-thought. Pinned heuristic with fixed thresholds, not a
/// general correctness guarantee: the goal is that delivered content never
/// visibly shrinks or flickers.
#[derive(Debug, Default)]
pub struct ContentArbiter {
    current: String,
    locked: bool,
}

impl ContentArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Track the streamed text. Later turns can carry shorter text (a brief
    /// closing remark after tool-use turns); once locked, a partial that
    /// would shrink the delivered content is ignored. The lock flips once the
    /// text is long enough and no longer looks like a mid-sentence fragment.
    pub fn observe_partial(&mut self, accumulated: &str) {
        if self.locked && accumulated.len() < self.current.len() {
            return;
        }
        self.current = accumulated.to_string();
        if !self.locked && self.current.len() > LOCK_MIN_LEN && !looks_mid_sentence(&self.current) {
            self.locked = true;
        }
    }

    /// Arbitrate a finalized candidate against the delivered text and return
    /// the winner.
    pub fn resolve(&mut self, candidate: &str) -> &str {
        if !self.locked {
            self.current = candidate.to_string();
            return &self.current;
        }

        let big_enough = candidate.len() > REPLACE_RATIO * self.current.len();
        let above_floor = candidate.len() > REPLACE_FLOOR;
        if big_enough && above_floor && !ends_dangling(candidate) {
            self.current = candidate.to_string();
        }
        &self.current
    }
}

fn ends_dangling(text: &str) -> bool {
    let trimmed = text.trim_end();
    DANGLING_CONNECTIVES
        .iter()
        .any(|connective| trimmed.ends_with(connective))
}

fn looks_mid_sentence(text: &str) -> bool {
    let trimmed = text.trim_end();
    if trimmed.is_empty() || ends_dangling(trimmed) {
        return true;
    }
    !trimmed.ends_with(['.', '!', '?', '"', ')', ']'])
}
