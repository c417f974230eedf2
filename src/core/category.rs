use crate::config::CategoryKeywords;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Pothole,
    Garbage,
    WaterLeak,
    PropertyDamage,
    Environment,
    Other,
}

impl Category {
    /// Scored categories in tie-break order; `Other` is the fallback.
    pub const SCORED: [Category; 5] = [
        Category::Pothole,
        Category::Garbage,
        Category::WaterLeak,
        Category::PropertyDamage,
        Category::Environment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Pothole => "pothole",
            Category::Garbage => "garbage",
            Category::WaterLeak => "water-leak",
            Category::PropertyDamage => "property-damage",
            Category::Environment => "environment",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pothole" => Ok(Category::Pothole),
            "garbage" => Ok(Category::Garbage),
            "water-leak" | "water" => Ok(Category::WaterLeak),
            "property-damage" => Ok(Category::PropertyDamage),
            "environment" => Ok(Category::Environment),
            "other" => Ok(Category::Other),
            _ => Err(UnknownCategory(s.to_string())),
        }
    }
}

/// Per-category totals, in [`Category::SCORED`] order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CategoryScores {
    pub pothole: u32,
    pub garbage: u32,
    pub water_leak: u32,
    pub property_damage: u32,
    pub environment: u32,
}

impl CategoryScores {
    pub fn get(&self, category: Category) -> u32 {
        match category {
            Category::Pothole => self.pothole,
            Category::Garbage => self.garbage,
            Category::WaterLeak => self.water_leak,
            Category::PropertyDamage => self.property_damage,
            Category::Environment => self.environment,
            Category::Other => 0,
        }
    }

    /// Strictly highest score wins; earlier categories win ties.
    pub fn best(&self) -> Category {
        let mut best = Category::Other;
        let mut best_score = 0;
        for category in Category::SCORED {
            let score = self.get(category);
            if score > best_score {
                best = category;
                best_score = score;
            }
        }
        best
    }
}

/// Substring containment in either direction.
pub fn fuzzy_match(label: &str, keyword: &str) -> bool {
    label.contains(keyword) || keyword.contains(label)
}

fn score_keywords(labels: &[String], keywords: &[String]) -> u32 {
    let mut score = 0;
    for label in labels {
        for keyword in keywords {
            if fuzzy_match(label, keyword) {
                score += 1;
            }
        }
    }
    score
}

pub fn category_scores<S: AsRef<str>>(labels: &[S], keywords: &CategoryKeywords) -> CategoryScores {
    let labels: Vec<String> = labels.iter().map(|l| l.as_ref().to_lowercase()).collect();

    CategoryScores {
        pothole: score_keywords(&labels, &keywords.pothole),
        garbage: score_keywords(&labels, &keywords.garbage),
        water_leak: score_keywords(&labels, &keywords.water),
        property_damage: score_keywords(&labels, &keywords.property_damage),
        environment: score_keywords(&labels, &keywords.environment),
    }
}

/// Pick the issue category best supported by the label descriptions.
pub fn classify<S: AsRef<str>>(labels: &[S], keywords: &CategoryKeywords) -> Category {
    let scores = category_scores(labels, keywords);
    log::debug!("Category scores: {:?}", scores);
    scores.best()
}
