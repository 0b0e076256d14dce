// src/services/grading.rs

//! Pure classification of percentages: pass/fail, letter grades and
//! distribution buckets.

use std::fmt;

use serde::{Serialize, Serializer};

/// Letter grade, ordered from worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Grade {
    F,
    C,
    CPlus,
    B,
    BPlus,
    A,
}

impl Grade {
    pub fn as_str(self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::CPlus => "C+",
            Grade::C => "C",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Grade {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Maps a percentage to a letter grade. NaN grades as F.
pub fn letter_grade(percentage: f64) -> Grade {
    if percentage >= 90.0 {
        Grade::A
    } else if percentage >= 80.0 {
        Grade::BPlus
    } else if percentage >= 70.0 {
        Grade::B
    } else if percentage >= 60.0 {
        Grade::CPlus
    } else if percentage >= 50.0 {
        Grade::C
    } else {
        Grade::F
    }
}

pub fn is_passing(percentage: f64, passing_percentage: f64) -> bool {
    percentage >= passing_percentage
}

/// Fixed score-distribution buckets, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBucket {
    Below50,
    Fifties,
    Sixties,
    Seventies,
    Eighties,
    Top,
}

impl ScoreBucket {
    pub const ALL: [ScoreBucket; 6] = [
        ScoreBucket::Below50,
        ScoreBucket::Fifties,
        ScoreBucket::Sixties,
        ScoreBucket::Seventies,
        ScoreBucket::Eighties,
        ScoreBucket::Top,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ScoreBucket::Below50 => "0-49",
            ScoreBucket::Fifties => "50-59",
            ScoreBucket::Sixties => "60-69",
            ScoreBucket::Seventies => "70-79",
            ScoreBucket::Eighties => "80-89",
            ScoreBucket::Top => "90-100",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Every percentage lands in exactly one bucket; out-of-range values are clamped
/// to the outer buckets.
pub fn score_bucket(percentage: f64) -> ScoreBucket {
    if percentage >= 90.0 {
        ScoreBucket::Top
    } else if percentage >= 80.0 {
        ScoreBucket::Eighties
    } else if percentage >= 70.0 {
        ScoreBucket::Seventies
    } else if percentage >= 60.0 {
        ScoreBucket::Sixties
    } else if percentage >= 50.0 {
        ScoreBucket::Fifties
    } else {
        ScoreBucket::Below50
    }
}

/// Rounds to `places` decimal places, halves away from zero.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
