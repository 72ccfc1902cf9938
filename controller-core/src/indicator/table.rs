//! Blink pattern registry.

use core::fmt;

use heapless::Vec;

/// Maximum number of blink patterns a table can hold.
pub const MAX_BLINK_PATTERNS: usize = 8;

/// Identifier handed out by [`PatternTable::register`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PatternId(u8);

impl PatternId {
    /// Raw sequential index.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }

    /// Position in the registration order.
    #[must_use]
    pub const fn as_index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// On/off run lengths, counted in blink units.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BlinkPattern {
    pub on_units: u8,
    pub off_units: u8,
}

impl BlinkPattern {
    /// Pattern that never lights the indicator.
    pub const DARK: Self = Self::new(0, 1);

    #[must_use]
    pub const fn new(on_units: u8, off_units: u8) -> Self {
        Self {
            on_units,
            off_units,
        }
    }

    /// Units in one full on+off cycle.
    #[must_use]
    pub const fn period(&self) -> u16 {
        self.on_units as u16 + self.off_units as u16
    }

    /// Indicator level at `phase` units into the cycle.
    #[must_use]
    pub const fn level_at(&self, phase: u16) -> bool {
        phase < self.on_units as u16
    }
}

impl fmt::Display for BlinkPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.on_units, self.off_units)
    }
}

/// Errors that may occur while registering patterns.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PatternTableError {
    /// Table has reached its capacity.
    TableFull,
}

impl fmt::Display for PatternTableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternTableError::TableFull => f.write_str("blink pattern table full"),
        }
    }
}

/// Append-only table of blink patterns. Ids are assigned in registration
/// order, so a fixed registration sequence yields the same ids every boot.
#[derive(Clone, Debug)]
pub struct PatternTable<const CAPACITY: usize = MAX_BLINK_PATTERNS> {
    patterns: Vec<BlinkPattern, CAPACITY>,
}

impl<const CAPACITY: usize> PatternTable<CAPACITY> {
    /// Creates an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Stores a pattern and returns the next sequential id.
    pub fn register(
        &mut self,
        on_units: u8,
        off_units: u8,
    ) -> Result<PatternId, PatternTableError> {
        let index = self.patterns.len();
        let id = u8::try_from(index).map_err(|_| PatternTableError::TableFull)?;
        self.patterns
            .push(BlinkPattern::new(on_units, off_units))
            .map_err(|_| PatternTableError::TableFull)?;
        Ok(PatternId(id))
    }

    /// Looks up a pattern by id.
    #[must_use]
    pub fn get(&self, id: PatternId) -> Option<&BlinkPattern> {
        self.patterns.get(id.as_index())
    }

    /// Returns the number of registered patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Returns `true` when no patterns are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Iterates `(id, pattern)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (PatternId, &BlinkPattern)> {
        self.patterns
            .iter()
            .enumerate()
            .map_while(|(index, pattern)| {
                u8::try_from(index).ok().map(|id| (PatternId(id), pattern))
            })
    }
}

impl<const CAPACITY: usize> Default for PatternTable<CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}
