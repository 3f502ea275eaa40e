//! The dish record every plugin produces.

use serde::{Deserialize, Serialize};

/// A single dish on a day's menu.
///
/// Values are stored exactly as the plugin supplied them; cleanup for
/// display happens in [`crate::render`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Food {
    dish: String,
    description: String,
}

impl Food {
    pub fn new(dish: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            dish: dish.into(),
            description: description.into(),
        }
    }

    /// Dish name. May be empty when a plugin only has a description.
    pub fn dish(&self) -> &str {
        &self.dish
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}
