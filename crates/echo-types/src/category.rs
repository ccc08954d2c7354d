//! Well-known entry categories.
//!
//! Categories are free-form strings; these are the labels the thought
//! recorder writes and the projections look for.

pub const MILESTONE: &str = "milestone";
pub const DECISION: &str = "decision";
pub const PATTERN_RECOGNITION: &str = "pattern_recognition";
pub const PROBLEM_SOLVING: &str = "problem_solving";
pub const LEARNING: &str = "learning";
pub const SYSTEM_UNDERSTANDING: &str = "system_understanding";
pub const USER_INTERACTION: &str = "user_interaction";

/// Every well-known category, in display order.
pub const ALL: [&str; 7] = [
    MILESTONE,
    DECISION,
    PATTERN_RECOGNITION,
    PROBLEM_SOLVING,
    LEARNING,
    SYSTEM_UNDERSTANDING,
    USER_INTERACTION,
];

pub fn is_well_known(category: &str) -> bool {
    ALL.contains(&category)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_lookup() {
        assert!(is_well_known("milestone"));
        assert!(!is_well_known("Milestone"));
        assert!(!is_well_known("grocery_list"));
    }
}
