use crate::core::category::Category;
use crate::core::labels::{LabelAnnotation, normalized_descriptions};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Mild => "mild",
            Severity::Moderate => "moderate",
            Severity::Severe => "severe",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const POTHOLE_SEVERE: &[&str] = &["sinkhole", "crater", "deep"];
pub const POTHOLE_MODERATE: &[&str] = &["pothole", "puddle", "road", "tar"];

pub const GARBAGE_SEVERE: &[&str] = &["pollution", "dumpster", "waste container"];
pub const GARBAGE_MODERATE: &[&str] = &["garbage", "trash", "litter", "plastic bag"];
/// Confidence a severe garbage label must exceed.
pub const GARBAGE_SEVERE_CONFIDENCE: f32 = 0.70;
/// Confidence a moderate garbage label must exceed.
pub const GARBAGE_MODERATE_CONFIDENCE: f32 = 0.50;

pub const WATER_SEVERE: &[&str] = &["flood", "flooding"];
pub const WATER_MODERATE: &[&str] = &["puddle", "rain"];

pub const PROPERTY_SEVERE: &[&str] = &["collapse", "damage"];
pub const PROPERTY_MODERATE: &[&str] = &["crack", "wall"];

pub const ENVIRONMENT_SEVERE: &[&str] = &["wildfire", "fire"];
pub const ENVIRONMENT_MODERATE: &[&str] = &["pollution", "smoke"];

fn any_in(labels: &[String], words: &[&str]) -> bool {
    labels.iter().any(|label| words.contains(&label.as_str()))
}

/// Highest confidence among labels whose text is one of `words`, or 0.
fn max_confidence(labels: &[LabelAnnotation], words: &[&str]) -> f32 {
    labels
        .iter()
        .filter(|label| words.contains(&label.normalized().as_str()))
        .map(|label| label.confidence)
        .fold(0.0, f32::max)
}

fn by_presence(labels: &[String], severe: &[&str], moderate: &[&str]) -> Severity {
    if any_in(labels, severe) {
        Severity::Severe
    } else if any_in(labels, moderate) {
        Severity::Moderate
    } else {
        Severity::Mild
    }
}

/// Grade how serious a report is, using the rules of its category.
///
/// Garbage is graded on label confidence; every other category on whether
/// an exact (lower-cased) label is present. Missing evidence is always
/// `Mild`.
pub fn score_severity(labels: &[LabelAnnotation], category: Category) -> Severity {
    let texts = normalized_descriptions(labels);

    match category {
        Category::Pothole => by_presence(&texts, POTHOLE_SEVERE, POTHOLE_MODERATE),
        Category::Garbage => {
            let severe_score = max_confidence(labels, GARBAGE_SEVERE);
            let moderate_score = max_confidence(labels, GARBAGE_MODERATE);
            log::debug!(
                "Garbage severity scores: severe={:.2} moderate={:.2}",
                severe_score,
                moderate_score
            );

            if severe_score > GARBAGE_SEVERE_CONFIDENCE {
                Severity::Severe
            } else if moderate_score > GARBAGE_MODERATE_CONFIDENCE {
                Severity::Moderate
            } else {
                Severity::Mild
            }
        }
        Category::WaterLeak => by_presence(&texts, WATER_SEVERE, WATER_MODERATE),
        Category::PropertyDamage => by_presence(&texts, PROPERTY_SEVERE, PROPERTY_MODERATE),
        Category::Environment => by_presence(&texts, ENVIRONMENT_SEVERE, ENVIRONMENT_MODERATE),
        Category::Other => Severity::Mild,
    }
}
