//! The click pattern grid.
//!
//! A pattern is a fixed 8×16 grid of click states. Only the first
//! `num_measures` rows, and in each row only the first `beats_in(row)`
//! columns, are played. Everything outside that region is kept as-is so that
//! shrinking and re-growing the pattern never loses edits.

use super::{clamp_beats, clamp_measures, DEFAULT_BEATS, DEFAULT_MEASURES, MAX_BEATS, MAX_MEASURES};
use crate::audio::Timbre;
use serde::{Deserialize, Serialize};

/// State of one beat slot.
///
/// Serialized as `0` (off), `1` (normal) or `2` (accent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ClickState {
    /// Silent beat. The cursor still moves over it.
    #[default]
    Off,
    /// Ordinary click.
    Normal,
    /// Accented click.
    Accent,
}

impl ClickState {
    /// Next state in the Off → Normal → Accent → Off cycle.
    pub fn cycle(self) -> Self {
        match self {
            ClickState::Off => ClickState::Normal,
            ClickState::Normal => ClickState::Accent,
            ClickState::Accent => ClickState::Off,
        }
    }

    /// The click sound for this state, or None for a silent beat.
    pub fn timbre(self) -> Option<Timbre> {
        match self {
            ClickState::Off => None,
            ClickState::Normal => Some(Timbre::Normal),
            ClickState::Accent => Some(Timbre::Accent),
        }
    }
}

impl From<ClickState> for u8 {
    fn from(state: ClickState) -> Self {
        match state {
            ClickState::Off => 0,
            ClickState::Normal => 1,
            ClickState::Accent => 2,
        }
    }
}

impl TryFrom<u8> for ClickState {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ClickState::Off),
            1 => Ok(ClickState::Normal),
            2 => Ok(ClickState::Accent),
            other => Err(format!("invalid click state {}", other)),
        }
    }
}

/// A position in the pattern: (measure, beat), both 0-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Cursor {
    pub measure: usize,
    pub beat: usize,
}

impl Cursor {
    /// The first beat of the first measure.
    pub const ORIGIN: Cursor = Cursor {
        measure: 0,
        beat: 0,
    };

    /// Creates a cursor.
    pub fn new(measure: usize, beat: usize) -> Self {
        Self { measure, beat }
    }
}

/// Fixed-capacity click grid with per-measure beat counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    cells: [[ClickState; MAX_BEATS]; MAX_MEASURES],
    beats_per_measure: [usize; MAX_MEASURES],
    num_measures: usize,
}

impl Default for Pattern {
    fn default() -> Self {
        Self::new()
    }
}

impl Pattern {
    /// Creates an all-off pattern with 4 measures of 4 beats.
    pub fn new() -> Self {
        Self {
            cells: [[ClickState::Off; MAX_BEATS]; MAX_MEASURES],
            beats_per_measure: [DEFAULT_BEATS; MAX_MEASURES],
            num_measures: DEFAULT_MEASURES,
        }
    }

    /// Number of active measures.
    pub fn num_measures(&self) -> usize {
        self.num_measures
    }

    /// Active beat count of `measure`. Out-of-range measures report 0.
    pub fn beats_in(&self, measure: usize) -> usize {
        self.beats_per_measure.get(measure).copied().unwrap_or(0)
    }

    /// Beat counts of the active measures.
    pub fn beats_per_measure(&self) -> &[usize] {
        &self.beats_per_measure[..self.num_measures]
    }

    /// The full grid, including inactive padding.
    pub fn rows(&self) -> &[[ClickState; MAX_BEATS]; MAX_MEASURES] {
        &self.cells
    }

    /// State of the cell at (measure, beat). Out-of-range cells read as Off.
    pub fn cell(&self, measure: usize, beat: usize) -> ClickState {
        self.cells
            .get(measure)
            .and_then(|row| row.get(beat))
            .copied()
            .unwrap_or_default()
    }

    /// Returns true if (measure, beat) is inside the played region.
    pub fn is_active(&self, measure: usize, beat: usize) -> bool {
        measure < self.num_measures && beat < self.beats_in(measure)
    }

    /// Sets the number of active measures, clamped to `1..=8`.
    ///
    /// Rows leaving or re-entering the active region keep their cells and
    /// beat counts. Returns true if the count changed.
    pub fn set_num_measures(&mut self, measures: usize) -> bool {
        let measures = clamp_measures(measures);
        let changed = measures != self.num_measures;
        self.num_measures = measures;
        changed
    }

    /// Sets the beat count of `measure`, clamped to `1..=16`.
    ///
    /// Cells beyond the new count are kept. Returns true if the count
    /// changed; out-of-range measures are ignored.
    pub fn set_beats(&mut self, measure: usize, beats: usize) -> bool {
        let Some(slot) = self.beats_per_measure.get_mut(measure) else {
            return false;
        };
        let beats = clamp_beats(beats);
        let changed = *slot != beats;
        *slot = beats;
        changed
    }

    /// Sets one cell. Returns true if its state changed; out-of-range cells
    /// are ignored.
    pub fn set_cell(&mut self, measure: usize, beat: usize, state: ClickState) -> bool {
        let Some(cell) = self.cells.get_mut(measure).and_then(|row| row.get_mut(beat)) else {
            return false;
        };
        let changed = *cell != state;
        *cell = state;
        changed
    }

    /// Advances one cell through Off → Normal → Accent → Off.
    ///
    /// # Returns
    ///
    /// The new state, or None if the cell is out of range.
    pub fn cycle_cell(&mut self, measure: usize, beat: usize) -> Option<ClickState> {
        let cell = self.cells.get_mut(measure)?.get_mut(beat)?;
        *cell = cell.cycle();
        Some(*cell)
    }

    /// Total number of beats in one pass through the active region.
    pub fn cycle_length(&self) -> usize {
        self.beats_per_measure().iter().sum()
    }

    /// The position following `cursor`, wrapping the beat at the end of its
    /// measure and the measure at the end of the active region.
    pub fn advance(&self, cursor: Cursor) -> Cursor {
        let mut next = Cursor::new(cursor.measure, cursor.beat + 1);
        if next.beat >= self.beats_in(next.measure) {
            next.beat = 0;
            next.measure += 1;
            if next.measure >= self.num_measures {
                next.measure = 0;
            }
        }
        next
    }

    /// Maps a flat index into the cyclic sequence of active beats to a cursor.
    pub fn position_at(&self, index: usize) -> Cursor {
        let mut remaining = index % self.cycle_length().max(1);
        for (measure, &beats) in self.beats_per_measure().iter().enumerate() {
            if remaining < beats {
                return Cursor::new(measure, remaining);
            }
            remaining -= beats;
        }
        Cursor::ORIGIN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern_with_beats(beats: &[usize]) -> Pattern {
        let mut pattern = Pattern::new();
        pattern.set_num_measures(beats.len());
        for (measure, &count) in beats.iter().enumerate() {
            pattern.set_beats(measure, count);
        }
        pattern
    }

    #[test]
    fn test_click_state_cycle() {
        assert_eq!(ClickState::Off.cycle(), ClickState::Normal);
        assert_eq!(ClickState::Normal.cycle(), ClickState::Accent);
        assert_eq!(ClickState::Accent.cycle(), ClickState::Off);
        assert_eq!(ClickState::Off.timbre(), None);
        assert_eq!(ClickState::Accent.timbre(), Some(Timbre::Accent));
    }

    #[test]
    fn test_click_state_serialization() {
        let json = serde_json::to_string(&[ClickState::Off, ClickState::Normal, ClickState::Accent])
            .unwrap();
        assert_eq!(json, "[0,1,2]");
        let states: Vec<ClickState> = serde_json::from_str("[2,0,1]").unwrap();
        assert_eq!(
            states,
            vec![ClickState::Accent, ClickState::Off, ClickState::Normal]
        );
        assert!(serde_json::from_str::<ClickState>("3").is_err());
    }

    #[test]
    fn test_defaults() {
        let pattern = Pattern::new();
        assert_eq!(pattern.num_measures(), DEFAULT_MEASURES);
        assert_eq!(pattern.beats_per_measure(), &[4, 4, 4, 4]);
        assert_eq!(pattern.cycle_length(), 16);
        assert_eq!(pattern.cell(0, 0), ClickState::Off);
    }

    #[test]
    fn test_counts_are_clamped() {
        let mut pattern = Pattern::new();
        pattern.set_num_measures(0);
        assert_eq!(pattern.num_measures(), 1);
        pattern.set_num_measures(20);
        assert_eq!(pattern.num_measures(), MAX_MEASURES);

        pattern.set_beats(0, 0);
        assert_eq!(pattern.beats_in(0), 1);
        pattern.set_beats(0, 99);
        assert_eq!(pattern.beats_in(0), MAX_BEATS);
        assert!(!pattern.set_beats(MAX_MEASURES, 4));
    }

    #[test]
    fn test_resize_preserves_cells() {
        let mut pattern = Pattern::new();
        pattern.set_cell(0, 3, ClickState::Accent);
        pattern.set_cell(3, 1, ClickState::Normal);
        pattern.set_beats(3, 7);

        pattern.set_beats(0, 2);
        pattern.set_num_measures(1);
        assert!(!pattern.is_active(0, 3));
        assert!(!pattern.is_active(3, 1));

        pattern.set_beats(0, 4);
        pattern.set_num_measures(4);
        assert_eq!(pattern.cell(0, 3), ClickState::Accent);
        assert_eq!(pattern.cell(3, 1), ClickState::Normal);
        assert_eq!(pattern.beats_in(3), 7);
    }

    #[test]
    fn test_cycle_cell() {
        let mut pattern = Pattern::new();
        assert_eq!(pattern.cycle_cell(1, 2), Some(ClickState::Normal));
        assert_eq!(pattern.cycle_cell(1, 2), Some(ClickState::Accent));
        assert_eq!(pattern.cycle_cell(1, 2), Some(ClickState::Off));
        assert_eq!(pattern.cycle_cell(8, 0), None);
        assert_eq!(pattern.cycle_cell(0, 16), None);
    }

    #[test]
    fn test_advance_wraps() {
        let pattern = pattern_with_beats(&[3, 5]);
        let mut cursor = Cursor::ORIGIN;
        let mut visited = Vec::new();
        for _ in 0..9 {
            visited.push((cursor.measure, cursor.beat));
            cursor = pattern.advance(cursor);
        }
        assert_eq!(
            visited,
            vec![
                (0, 0),
                (0, 1),
                (0, 2),
                (1, 0),
                (1, 1),
                (1, 2),
                (1, 3),
                (1, 4),
                (0, 0)
            ]
        );
        // 9 advances from the origin land on flat position 9 mod 8 = 1
        assert_eq!(cursor, Cursor::new(0, 1));
    }

    #[test]
    fn test_advance_matches_flattened_sequence() {
        let shapes: [&[usize]; 5] = [&[1], &[4], &[3, 5], &[16, 1, 7], &[2, 2, 2, 2, 2, 2, 2, 2]];
        for beats in shapes {
            let pattern = pattern_with_beats(beats);
            let mut cursor = Cursor::ORIGIN;
            for n in 0..100 {
                assert_eq!(cursor, pattern.position_at(n), "shape {:?} step {}", beats, n);
                cursor = pattern.advance(cursor);
            }
        }
    }

    #[test]
    fn test_single_beat_pattern_stays_at_origin() {
        let pattern = pattern_with_beats(&[1]);
        assert_eq!(pattern.advance(Cursor::ORIGIN), Cursor::ORIGIN);
    }
}
