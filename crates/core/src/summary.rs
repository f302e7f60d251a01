//! Reduce a video's detection records to a single summary.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::detection::DetectionRecord;

/// Per-video detection summary.
///
/// Serializes as `{"status":"No Detection"}` or
/// `{"status":"Detected","top_label":..,"mean_conf":..,"frames_detected":..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum Summary {
    #[serde(rename = "No Detection")]
    NoDetection,

    #[serde(rename = "Detected")]
    Detected {
        /// Most frequent label across all records.
        top_label: String,
        /// Mean confidence of the `top_label` records, rounded to 3 decimals.
        mean_conf: f64,
        /// Distinct frames containing at least one detection of any label.
        frames_detected: u64,
    },
}

impl Summary {
    pub fn top_label(&self) -> Option<&str> {
        match self {
            Summary::NoDetection => None,
            Summary::Detected { top_label, .. } => Some(top_label),
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            Summary::NoDetection => "No Detection",
            Summary::Detected { .. } => "Detected",
        }
    }
}

/// Summarize all records collected for one video.
///
/// The top label is the one with the most records; on a tie the label seen
/// first wins. `frames_detected` counts frames with any detection, not only
/// frames containing the top label.
pub fn summarize(records: &[DetectionRecord]) -> Summary {
    if records.is_empty() {
        return Summary::NoDetection;
    }

    // (label, count) in first-seen order.
    let mut counts: Vec<(&str, usize)> = Vec::new();
    let mut slot: HashMap<&str, usize> = HashMap::new();
    for record in records {
        match slot.get(record.label.as_str()) {
            Some(&i) => counts[i].1 += 1,
            None => {
                slot.insert(record.label.as_str(), counts.len());
                counts.push((record.label.as_str(), 1));
            }
        }
    }

    let mut top = counts[0];
    for &entry in &counts[1..] {
        if entry.1 > top.1 {
            top = entry;
        }
    }
    let (top_label, top_count) = top;

    let conf_sum: f64 = records
        .iter()
        .filter(|r| r.label == top_label)
        .map(|r| f64::from(r.confidence))
        .sum();
    let mean_conf = round_to(conf_sum / top_count as f64, 3);

    let frames_detected = records
        .iter()
        .map(|r| r.frame_index)
        .collect::<HashSet<_>>()
        .len() as u64;

    Summary::Detected {
        top_label: top_label.to_string(),
        mean_conf,
        frames_detected,
    }
}

/// Round half away from zero to `decimals` places.
fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
