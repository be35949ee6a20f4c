//! Read/write fit report JSON files.
//!
//! A report is the portable record of one fit:
//! - the segmentation, onset and fitted targets
//! - the search/regularization settings that produced them
//! - quality diagnostics
//! - observed and fitted contours, for re-plotting without refitting
//!
//! The schema is defined by `domain::FitReportFile`.

use std::fs::File;
use std::path::Path;

use crate::domain::FitReportFile;
use crate::error::AppError;

/// Write a report JSON file.
pub fn write_report_json(path: &Path, report: &FitReportFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create report JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, report)
        .map_err(|e| AppError::io(format!("Failed to write report JSON: {e}")))?;
    Ok(())
}

/// Read a report JSON file.
pub fn read_report_json(path: &Path) -> Result<FitReportFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open report JSON '{}': {e}", path.display())))?;
    let report: FitReportFile =
        serde_json::from_reader(file).map_err(|e| AppError::io(format!("Invalid report JSON: {e}")))?;
    Ok(report)
}
