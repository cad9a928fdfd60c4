//! ASCII scenario format for the command-line walker.
//!
//! A scenario is a rectangular block of glyphs: `#` wall, `.` floor,
//! `S` the walker's start cell, `G` its goal, `M` a monster parked on
//! its cell. Blank lines and lines starting with `;` are skipped so
//! scenario files can carry titles and notes.

use gridfare_core::CellCoord;
use thiserror::Error;

/// Problems a scenario file can have.
#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum ScenarioError {
    /// No grid rows at all.
    #[error("scenario contains no grid rows")]
    Empty,
    /// A row length disagrees with the first row.
    #[error("row {row} is {found} cells wide, expected {expected}")]
    Ragged {
        /// Zero-based row index.
        row: usize,
        /// Cells found on the row.
        found: usize,
        /// Cells on the first row.
        expected: usize,
    },
    /// A glyph outside the documented set.
    #[error("unknown glyph {glyph:?} at column {column}, row {row}")]
    UnknownGlyph {
        /// Offending character.
        glyph: char,
        /// Zero-based column index.
        column: usize,
        /// Zero-based row index.
        row: usize,
    },
    /// More than one `S` or `G` marker.
    #[error("duplicate {marker:?} marker")]
    DuplicateMarker {
        /// The repeated marker.
        marker: char,
    },
    /// No `S` marker.
    #[error("missing start marker 'S'")]
    MissingStart,
    /// No `G` marker.
    #[error("missing goal marker 'G'")]
    MissingGoal,
}

/// Parsed scenario: grid dimensions plus the placements read from it.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Scenario {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) walls: Vec<CellCoord>,
    pub(crate) monsters: Vec<CellCoord>,
    pub(crate) start: CellCoord,
    pub(crate) goal: CellCoord,
}

impl Scenario {
    /// Parses scenario text.
    pub(crate) fn parse(text: &str) -> Result<Self, ScenarioError> {
        let rows: Vec<&str> = text
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty() && !line.starts_with(';'))
            .collect();
        if rows.is_empty() {
            return Err(ScenarioError::Empty);
        }

        let expected = rows[0].chars().count();
        let mut walls = Vec::new();
        let mut monsters = Vec::new();
        let mut start = None;
        let mut goal = None;

        for (row_index, row) in rows.iter().enumerate() {
            let found = row.chars().count();
            if found != expected {
                return Err(ScenarioError::Ragged {
                    row: row_index,
                    found,
                    expected,
                });
            }

            for (column_index, glyph) in row.chars().enumerate() {
                let cell = CellCoord::new(column_index as u32, row_index as u32);
                match glyph {
                    '.' => {}
                    '#' => walls.push(cell),
                    'M' => monsters.push(cell),
                    'S' => {
                        if start.replace(cell).is_some() {
                            return Err(ScenarioError::DuplicateMarker { marker: 'S' });
                        }
                    }
                    'G' => {
                        if goal.replace(cell).is_some() {
                            return Err(ScenarioError::DuplicateMarker { marker: 'G' });
                        }
                    }
                    other => {
                        return Err(ScenarioError::UnknownGlyph {
                            glyph: other,
                            column: column_index,
                            row: row_index,
                        });
                    }
                }
            }
        }

        Ok(Self {
            width: expected as u32,
            height: rows.len() as u32,
            walls,
            monsters,
            start: start.ok_or(ScenarioError::MissingStart)?,
            goal: goal.ok_or(ScenarioError::MissingGoal)?,
        })
    }
}
