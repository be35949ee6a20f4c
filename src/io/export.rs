//! Export fitted targets.
//!
//! - VocalTractLab gestural score (`.ges`), for resynthesis
//! - plain CSV, for spreadsheets and scripts

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::{PitchTarget, Sample};
use crate::error::AppError;

/// Length (s) of the onset gesture; also taken off the first target.
pub const ONSET_GESTURE_DURATION: f64 = 0.01;

/// Write targets as an f0 gesture sequence of a VTL gestural score.
pub fn write_gesture_file(path: &Path, onset: Sample, targets: &[PitchTarget]) -> Result<(), AppError> {
    let mut out = create(path, "gesture file")?;
    out.write_all(format_gestures(onset, targets).as_bytes())
        .and_then(|()| out.flush())
        .map_err(|e| AppError::io(format!("Failed to write gesture file: {e}")))
}

pub fn format_gestures(onset: Sample, targets: &[PitchTarget]) -> String {
    let mut s = String::new();
    s.push_str("<gestural_score>\n");
    s.push_str("\t<gesture_sequence type=\"f0-gestures\" unit=\"st\">\n");
    s.push_str(&gesture_line(onset.value, 0.0, ONSET_GESTURE_DURATION, ONSET_GESTURE_DURATION));
    for (i, t) in targets.iter().enumerate() {
        let duration = if i == 0 {
            t.duration - ONSET_GESTURE_DURATION
        } else {
            t.duration
        };
        s.push_str(&gesture_line(t.offset, t.slope, duration, t.tau / 1000.0));
    }
    s.push_str("\t</gesture_sequence>\n");
    s.push_str("</gestural_score>\n");
    s
}

fn gesture_line(value: f64, slope: f64, duration_s: f64, time_constant_s: f64) -> String {
    format!(
        "\t\t<gesture value=\"{value:.6}\" slope=\"{slope:.6}\" duration_s=\"{duration_s:.6}\" time_constant_s=\"{time_constant_s:.6}\" neutral=\"0\" />\n"
    )
}

/// Write the onset and targets as CSV.
///
/// First line `onset_time,onset_value`, then `slope,offset,tau,duration` per target.
pub fn write_targets_csv(path: &Path, onset: Sample, targets: &[PitchTarget]) -> Result<(), AppError> {
    let mut out = create(path, "CSV export")?;
    let write_err = |e: std::io::Error| AppError::io(format!("Failed to write CSV export: {e}"));

    writeln!(out, "{:.6},{:.6}", onset.time, onset.value).map_err(write_err)?;
    for t in targets {
        writeln!(out, "{:.6},{:.6},{:.6},{:.6}", t.slope, t.offset, t.tau, t.duration).map_err(write_err)?;
    }
    out.flush().map_err(write_err)
}

fn create(path: &Path, what: &str) -> Result<BufWriter<File>, AppError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| AppError::io(format!("Failed to create {what} '{}': {e}", path.display())))
}
