//! Gold food: what it is worth in nuggets and how much it heals.

use serde::{Deserialize, Serialize};

/// Nuggets in one gold ingot.
const NUGGETS_PER_INGOT: u32 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoldFood {
    GoldenCarrot,
    GoldenApple,
    EnchantedGoldenApple,
}

impl GoldFood {
    /// Map a host item category to gold food. Anything else is worth nothing.
    pub fn from_category(category: &str) -> Option<Self> {
        match category.to_ascii_lowercase().as_str() {
            "golden_carrot" => Some(GoldFood::GoldenCarrot),
            "golden_apple" => Some(GoldFood::GoldenApple),
            "enchanted_golden_apple" => Some(GoldFood::EnchantedGoldenApple),
            _ => None,
        }
    }

    /// Gold mass of one item, in nuggets.
    pub fn nugget_value(self) -> u32 {
        match self {
            GoldFood::GoldenCarrot => 8,
            GoldFood::GoldenApple => 8 * NUGGETS_PER_INGOT,
            GoldFood::EnchantedGoldenApple => 8 * NUGGETS_PER_INGOT * NUGGETS_PER_INGOT,
        }
    }

    /// Health restored when an undead horse is hand-fed one item.
    pub fn heal_amount(self) -> f64 {
        match self {
            GoldFood::GoldenCarrot => 4.0,
            GoldFood::GoldenApple | GoldFood::EnchantedGoldenApple => 10.0,
        }
    }
}

/// Nugget value of one item of `category`; zero for non-gold items.
pub fn nugget_value(category: &str) -> u32 {
    GoldFood::from_category(category).map_or(0, GoldFood::nugget_value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nugget_table() {
        assert_eq!(nugget_value("golden_carrot"), 8);
        assert_eq!(nugget_value("GOLDEN_APPLE"), 72);
        assert_eq!(nugget_value("enchanted_golden_apple"), 648);
        assert_eq!(nugget_value("carrot"), 0);
        assert_eq!(nugget_value("water_bucket"), 0);
    }

    #[test]
    fn apples_heal_more_than_carrots() {
        assert_eq!(GoldFood::GoldenCarrot.heal_amount(), 4.0);
        assert_eq!(GoldFood::GoldenApple.heal_amount(), 10.0);
        assert_eq!(GoldFood::EnchantedGoldenApple.heal_amount(), 10.0);
    }
}
