//! Praat PitchTier files (spreadsheet layout).
//!
//! ```text
//! "ooTextFile"
//! "PitchTier"
//! 0 0.600000 3
//! 0.010000	210.000000
//! …
//! ```
//!
//! Files hold frequencies in Hz; in memory the contour is in semitones
//! relative to 1 Hz.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::{Sample, TimeSignal};
use crate::error::AppError;

const HEADER_LINES: usize = 3;

pub fn hz_to_semitones(hz: f64) -> f64 {
    12.0 * hz.log2()
}

pub fn semitones_to_hz(st: f64) -> f64 {
    (st / 12.0).exp2()
}

/// Read a PitchTier and convert its values to semitones.
pub fn read_pitch_tier(path: &Path) -> Result<TimeSignal, AppError> {
    let text = fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read PitchTier '{}': {e}", path.display())))?;
    parse_pitch_tier(&text).map_err(|e| AppError::new(e.kind(), format!("{}: {e}", path.display())))
}

pub fn parse_pitch_tier(text: &str) -> Result<TimeSignal, AppError> {
    let mut signal = Vec::new();

    for (i, line) in text.lines().enumerate().skip(HEADER_LINES) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split_whitespace();
        let (Some(t), Some(v)) = (fields.next(), fields.next()) else {
            return Err(AppError::io(format!(
                "Line {} of PitchTier needs a time and a value: '{line}'.",
                i + 1
            )));
        };
        let time = parse_number(t, i)?;
        let hz = parse_number(v, i)?;
        if !(hz > 0.0) {
            return Err(AppError::io(format!(
                "Line {} of PitchTier has a non-positive frequency {hz} Hz.",
                i + 1
            )));
        }
        signal.push(Sample::new(time, hz_to_semitones(hz)));
    }

    Ok(signal)
}

/// Write a semitone contour as a PitchTier in Hz.
pub fn write_pitch_tier(path: &Path, f0: &[Sample]) -> Result<(), AppError> {
    let Some(last) = f0.last() else {
        return Err(AppError::config("Refusing to write an empty PitchTier."));
    };

    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create PitchTier '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);
    let write_err = |e: std::io::Error| AppError::io(format!("Failed to write PitchTier: {e}"));

    writeln!(out, "\"ooTextFile\"").map_err(write_err)?;
    writeln!(out, "\"PitchTier\"").map_err(write_err)?;
    writeln!(out, "0 {:.6} {}", last.time + 0.1, f0.len()).map_err(write_err)?;
    for s in f0 {
        writeln!(out, "{:.6}\t{:.6}", s.time, semitones_to_hz(s.value)).map_err(write_err)?;
    }
    out.flush().map_err(write_err)?;

    Ok(())
}

fn parse_number(s: &str, line: usize) -> Result<f64, AppError> {
    s.parse::<f64>()
        .map_err(|_| AppError::io(format!("Invalid number '{s}' on line {} of PitchTier.", line + 1)))
}
