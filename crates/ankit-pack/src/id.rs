//! Identifier allocation for notes, cards, decks, and models.
//!
//! Anki uses 63-bit signed integers as primary keys. Ids are sampled
//! uniformly from the non-negative range and checked against the set of ids
//! already issued, so two calls within one process never return the same
//! value.

use std::collections::HashSet;
use std::sync::{LazyLock, Mutex};

use rand::Rng;

/// Id of Anki's stock "Basic" note type.
pub const STANDARD_BASIC_MODEL_ID: i64 = 1607392319;

/// Id commonly used for the stock "Cloze" note type.
pub const STANDARD_CLOZE_MODEL_ID: i64 = 1122334455;

/// Id used for decks created without an explicit id.
pub const STANDARD_DECK_ID: i64 = 1347639657110;

/// Id of Anki's built-in "Default" deck.
pub const DEFAULT_DECK_ID: i64 = 1;

/// Id of the default deck options group.
pub const DEFAULT_DECK_CONFIG_ID: i64 = 1;

const RESERVED: [i64; 4] = [
    STANDARD_BASIC_MODEL_ID,
    STANDARD_CLOZE_MODEL_ID,
    STANDARD_DECK_ID,
    DEFAULT_DECK_ID,
];

static GLOBAL: LazyLock<Mutex<IdAllocator>> = LazyLock::new(|| Mutex::new(IdAllocator::new()));

/// Allocate a process-unique id.
///
/// # Example
///
/// ```
/// let a = ankit_pack::new_id();
/// let b = ankit_pack::new_id();
/// assert!(a > 0 && b > 0);
/// assert_ne!(a, b);
/// ```
pub fn new_id() -> i64 {
    // A poisoned lock still holds a valid issued set.
    let mut allocator = GLOBAL.lock().unwrap_or_else(|e| e.into_inner());
    allocator.next_id()
}

/// Mark an explicitly chosen id as used in the process-wide allocator.
///
/// Constructors that take an explicit id call this, so [`new_id`] never
/// hands the same value out later.
pub fn reserve_id(id: i64) {
    let mut allocator = GLOBAL.lock().unwrap_or_else(|e| e.into_inner());
    allocator.reserve(id);
}

/// Whether the process-wide allocator has issued or reserved `id`.
pub fn id_in_use(id: i64) -> bool {
    let allocator = GLOBAL.lock().unwrap_or_else(|e| e.into_inner());
    allocator.is_taken(id)
}

/// An allocator with its own issued set.
///
/// Use this when uniqueness only needs to hold within one package build.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    issued: HashSet<i64>,
}

impl IdAllocator {
    /// Create an allocator that knows only the reserved well-known ids.
    pub fn new() -> Self {
        Self {
            issued: RESERVED.iter().copied().collect(),
        }
    }

    /// Draw a fresh id in `1..=i64::MAX`, resampling on collision.
    pub fn next_id(&mut self) -> i64 {
        let mut rng = rand::thread_rng();
        loop {
            let candidate = rng.gen_range(1..=i64::MAX);
            if self.issued.insert(candidate) {
                return candidate;
            }
        }
    }

    /// Mark `id` as used. Returns `false` if it was already taken.
    pub fn reserve(&mut self, id: i64) -> bool {
        self.issued.insert(id)
    }

    /// Whether `id` has been issued or reserved.
    pub fn is_taken(&self, id: i64) -> bool {
        self.issued.contains(&id)
    }

    /// Number of ids issued or reserved, including the well-known ones.
    pub fn len(&self) -> usize {
        self.issued.len()
    }

    /// Always `false`: the well-known ids are reserved from the start.
    pub fn is_empty(&self) -> bool {
        self.issued.is_empty()
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
