//! Read-only view of a server-resolved recipe.
//!
//! A snapshot is replaced wholesale on every accepted server frame; nothing in
//! here is ever patched in place.

/// One purchasable ingredient line.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IngredientView {
    pub name: String,
    pub purchase_amount: String,
    pub purchase_cost: String,
    pub scratch_time_delta: String,
    pub scratch_cost_delta: String,
    /// True iff the server reported a scratch-cost delta, i.e. the ingredient
    /// has a sub-recipe and can be built instead of bought.
    pub is_expandable: bool,
}

impl IngredientView {
    pub fn new(
        name: String,
        purchase_amount: String,
        purchase_cost: String,
        scratch_time_delta: String,
        scratch_cost_delta: String,
    ) -> Self {
        let is_expandable = !scratch_cost_delta.trim().is_empty();
        Self {
            name,
            purchase_amount,
            purchase_cost,
            scratch_time_delta,
            scratch_cost_delta,
            is_expandable,
        }
    }

    /// Hover text for expandable ingredients, e.g.
    /// `"Save $1.00 by making flour from scratch in 2 hours."`.
    pub fn scratch_summary(&self) -> Option<String> {
        if !self.is_expandable {
            return None;
        }
        Some(format!(
            "{} by making {} from scratch in {}.",
            self.scratch_cost_delta,
            self.name.to_lowercase(),
            self.scratch_time_delta
        ))
    }
}

/// A group of steps for one (sub-)recipe.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DirectionView {
    pub step_group_name: String,
    pub instruction_lines: Vec<String>,
    pub total_time: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecipeSnapshot {
    pub version: String,
    pub recipe_name: String,
    pub amount: f64,
    pub measure_unit: String,
    /// Budget the server resolved against, when it echoes one.
    pub minutes: Option<f64>,
    pub total_cost: String,
    pub total_time: String,
    /// Root-absolute path of the dependency graph image, or empty.
    pub dependency_graph_ref: String,
    pub ingredients: Vec<IngredientView>,
    pub directions: Vec<DirectionView>,
}

impl RecipeSnapshot {
    /// The money part of the total, e.g. `"$2.30"` out of `"Lose $2.30"`.
    pub fn headline_cost(&self) -> &str {
        self.total_cost
            .split_whitespace()
            .nth(1)
            .unwrap_or(self.total_cost.as_str())
    }

    /// Directions to show. A recipe with nothing to make still gets one step.
    pub fn directions_or_purchase(&self) -> Vec<DirectionView> {
        if !self.directions.is_empty() {
            return self.directions.clone();
        }
        vec![DirectionView {
            step_group_name: format!("Make the {}", self.recipe_name),
            instruction_lines: vec!["Go and buy it.".to_string()],
            total_time: String::new(),
        }]
    }
}

/// Make a server-relative resource path root-absolute.
pub fn absolute_resource_path(relative: &str) -> String {
    let relative = relative.trim();
    if relative.is_empty() || relative.starts_with('/') {
        relative.to_string()
    } else {
        format!("/{}", relative)
    }
}
