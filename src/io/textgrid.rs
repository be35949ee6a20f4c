//! Segment boundaries from a Praat TextGrid.
//!
//! Accepted inputs:
//!
//! - a TextGrid in Praat's long or short text layout
//! - a plain list with one boundary time per line
//!
//! In a TextGrid only the first interval tier is read, and only intervals
//! whose label is a digit string (`"1"`, `"2"`, ...) count as segments. The
//! first such interval supplies its start and end time, every later one its
//! end time. Unlabelled pauses between segments are skipped.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::AppError;

/// One interval of an interval tier.
#[derive(Debug, Clone, PartialEq)]
struct Interval {
    xmin: f64,
    xmax: f64,
    text: String,
}

/// Read boundary times from a TextGrid (or plain list) file.
pub fn read_textgrid(path: &Path) -> Result<Vec<f64>, AppError> {
    let text = fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read TextGrid '{}': {e}", path.display())))?;
    parse_textgrid(&text)
        .map_err(|e| AppError::new(e.kind(), format!("{}: {e}", path.display())))
}

/// Parse boundary times from TextGrid (or plain list) text.
pub fn parse_textgrid(text: &str) -> Result<Vec<f64>, AppError> {
    let first = text.lines().map(str::trim).find(|l| !l.is_empty());
    let intervals = match first {
        None => return Err(AppError::io("TextGrid is empty.")),
        Some(line) if line.starts_with("File type") => {
            if text.lines().any(|l| key_value(l.trim(), "class").is_some()) {
                long_format_intervals(text)?
            } else {
                short_format_intervals(text)?
            }
        }
        Some(_) => return parse_plain_list(text),
    };
    boundaries_from_intervals(&intervals)
}

/// Boundaries spanned by the digit-labelled intervals.
fn boundaries_from_intervals(intervals: &[Interval]) -> Result<Vec<f64>, AppError> {
    let mut bounds = Vec::new();
    for interval in intervals.iter().filter(|i| is_segment_label(&i.text)) {
        if bounds.is_empty() {
            bounds.push(interval.xmin);
        }
        bounds.push(interval.xmax);
    }
    if bounds.is_empty() {
        return Err(AppError::io(
            "TextGrid interval tier has no segments; label the syllables 1, 2, 3, ...",
        ));
    }
    Ok(bounds)
}

fn is_segment_label(text: &str) -> bool {
    let label = text.trim();
    !label.is_empty() && label.bytes().all(|b| b.is_ascii_digit())
}

/// Intervals of the first interval tier in the long (`key = value`) layout.
fn long_format_intervals(text: &str) -> Result<Vec<Interval>, AppError> {
    let mut intervals = Vec::new();
    let mut current: Option<(Option<f64>, Option<f64>)> = None;
    let mut in_tier = false;
    let mut tier_seen = false;

    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.trim();

        if line.starts_with("item [") && line != "item []:" {
            if tier_seen {
                // Only the first interval tier is used.
                break;
            }
            in_tier = false;
            current = None;
            continue;
        }
        if let Some(class) = key_value(line, "class") {
            in_tier = unquote(class) == "IntervalTier";
            tier_seen = in_tier;
            continue;
        }
        if !in_tier {
            continue;
        }
        if line.starts_with("intervals [") {
            current = Some((None, None));
            continue;
        }
        let Some((xmin, xmax)) = current.as_mut() else {
            continue;
        };

        if let Some(v) = key_value(line, "xmin") {
            *xmin = Some(parse_time(v, lineno)?);
        } else if let Some(v) = key_value(line, "xmax") {
            *xmax = Some(parse_time(v, lineno)?);
        } else if let Some(v) = key_value(line, "text") {
            let (Some(xmin), Some(xmax)) = (*xmin, *xmax) else {
                return Err(AppError::io(format!(
                    "Interval ending on line {} of TextGrid lacks xmin or xmax.",
                    lineno + 1
                )));
            };
            intervals.push(Interval {
                xmin,
                xmax,
                text: unquote(v),
            });
            current = None;
        }
    }

    if !tier_seen {
        return Err(AppError::io("TextGrid has no interval tier."));
    }
    Ok(intervals)
}

/// Intervals of the first interval tier in the short (bare values) layout.
///
/// After the `"IntervalTier"` marker come the tier name, its xmin and xmax, the
/// interval count, and then one xmin / xmax / label triple per interval.
fn short_format_intervals(text: &str) -> Result<Vec<Interval>, AppError> {
    if !text.lines().any(|l| l.trim() == "\"IntervalTier\"") {
        return Err(AppError::io("TextGrid has no interval tier."));
    }
    let mut tokens = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i, l.trim()))
        .filter(|(_, l)| !l.is_empty())
        .skip_while(|(_, l)| *l != "\"IntervalTier\"")
        .skip(1);

    let truncated = || AppError::io("TextGrid interval tier is truncated.");
    let mut next = || tokens.next().ok_or_else(truncated);

    next()?; // tier name
    next()?; // tier xmin
    next()?; // tier xmax
    let (lineno, count) = next()?;
    let count: usize = count.parse().map_err(|_| {
        AppError::io(format!(
            "Invalid interval count '{count}' on line {} of TextGrid.",
            lineno + 1
        ))
    })?;

    (0..count)
        .map(|_| -> Result<Interval, AppError> {
            let (l, xmin) = next()?;
            let xmin = parse_time(xmin, l)?;
            let (l, xmax) = next()?;
            let xmax = parse_time(xmax, l)?;
            let (_, label) = next()?;
            Ok(Interval {
                xmin,
                xmax,
                text: unquote(label),
            })
        })
        .collect()
}

fn parse_plain_list(text: &str) -> Result<Vec<f64>, AppError> {
    text.lines()
        .enumerate()
        .map(|(i, l)| (i, l.trim()))
        .filter(|(_, l)| !l.is_empty())
        .map(|(i, l)| parse_time(l, i))
        .collect()
}

/// Write boundary times as a plain list, one per line.
pub fn write_boundary_list(path: &Path, boundaries: &[f64]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create boundary list '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);
    let write_err = |e: std::io::Error| AppError::io(format!("Failed to write boundary list: {e}"));
    for b in boundaries {
        writeln!(out, "{b:.6}").map_err(write_err)?;
    }
    out.flush().map_err(write_err)
}

/// Value of a `key = value` line.
fn key_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let (k, v) = line.split_once('=')?;
    (k.trim() == key).then(|| v.trim())
}

/// Strip the surrounding quotes of a Praat string and undouble inner quotes.
fn unquote(s: &str) -> String {
    let s = s.trim();
    let inner = s
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s);
    inner.replace("\"\"", "\"")
}

fn parse_time(s: &str, lineno: usize) -> Result<f64, AppError> {
    s.parse::<f64>().map_err(|_| {
        AppError::io(format!(
            "Invalid boundary time '{s}' on line {} of TextGrid.",
            lineno + 1
        ))
    })
}
