//! Classification rules.

/// Thresholds and category lists used by [`crate::classifier::classify`].
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierConfig {
    /// Sub-entity magnitude at or above which an event also goes to the
    /// high-value alert channel.
    pub high_value_threshold: f64,
    /// Population strictly above this routes the event to ULTRA_HIGH.
    pub population_ceiling: u32,
    /// Categories routed to ULTRA_HIGH.
    pub ultra_categories: Vec<String>,
    /// Categories routed to SPECIAL.
    pub special_categories: Vec<String>,
}

impl ClassifierConfig {
    pub fn is_ultra_category(&self, category: &str) -> bool {
        contains_ignore_case(&self.ultra_categories, category)
    }

    pub fn is_special_category(&self, category: &str) -> bool {
        contains_ignore_case(&self.special_categories, category)
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            high_value_threshold: 150_000_000.0,
            population_ceiling: 30,
            ultra_categories: vec!["ULTRA".into(), "VIP".into(), "EXCLUSIVE".into()],
            special_categories: vec!["SPECIAL".into(), "EVENT".into(), "HOLIDAY".into()],
        }
    }
}

fn contains_ignore_case(list: &[String], needle: &str) -> bool {
    let needle = needle.trim();
    list.iter().any(|c| c.eq_ignore_ascii_case(needle))
}
