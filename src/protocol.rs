//! JSON text frames exchanged with the recipe server.

use crate::error::ProtocolError;
use crate::overrides::OverrideSet;
use crate::params::RecipeParameters;
use crate::snapshot::{absolute_resource_path, DirectionView, IngredientView, RecipeSnapshot};
use serde::{Deserialize, Serialize};

/// Client -> server request. Built from the live parameters at send time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeRequest<'a> {
    pub recipe: String,
    pub ingredients_to_build: &'a OverrideSet,
    pub minutes: f64,
    pub amount: f64,
}

impl<'a> RecipeRequest<'a> {
    pub fn from_params(params: &'a RecipeParameters) -> Self {
        Self {
            recipe: params.recipe_id.to_lowercase(),
            ingredients_to_build: &params.overrides,
            minutes: params.minutes(),
            amount: params.amount,
        }
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireIngredient {
    name: String,
    #[serde(default)]
    amount: String,
    #[serde(default)]
    cost: String,
    #[serde(default)]
    scratch_time: String,
    #[serde(default)]
    scratch_cost: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireDirection {
    name: String,
    #[serde(default)]
    total_time: String,
    #[serde(default)]
    texts: Option<Vec<String>>,
}

/// Server -> client frame. Go encodes empty slices as `null`, hence the options.
/// `recipe` and `amount` are required; a frame without them is rejected.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSnapshot {
    #[serde(default)]
    version: String,
    recipe: String,
    #[serde(default)]
    measure: String,
    amount: f64,
    #[serde(default)]
    minutes: Option<f64>,
    #[serde(default)]
    total_cost: String,
    #[serde(default)]
    total_time: String,
    #[serde(default)]
    graph: String,
    #[serde(default)]
    ingredients: Option<Vec<WireIngredient>>,
    #[serde(default)]
    directions: Option<Vec<WireDirection>>,
}

impl From<WireIngredient> for IngredientView {
    fn from(wire: WireIngredient) -> Self {
        IngredientView::new(wire.name, wire.amount, wire.cost, wire.scratch_time, wire.scratch_cost)
    }
}

impl From<WireDirection> for DirectionView {
    fn from(wire: WireDirection) -> Self {
        DirectionView {
            step_group_name: wire.name,
            instruction_lines: wire.texts.unwrap_or_default(),
            total_time: wire.total_time,
        }
    }
}

/// Parse one inbound frame. Either the whole snapshot is good or nothing is.
pub fn parse_snapshot(raw: &str) -> Result<RecipeSnapshot, ProtocolError> {
    let wire: WireSnapshot = serde_json::from_str(raw)?;
    if wire.recipe.trim().is_empty() {
        return Err(ProtocolError::MissingField("recipe"));
    }

    Ok(RecipeSnapshot {
        version: wire.version,
        recipe_name: wire.recipe,
        amount: wire.amount,
        measure_unit: wire.measure,
        minutes: wire.minutes.filter(|m| m.is_finite() && *m > 0.0),
        total_cost: wire.total_cost,
        total_time: wire.total_time,
        dependency_graph_ref: absolute_resource_path(&wire.graph),
        ingredients: wire
            .ingredients
            .unwrap_or_default()
            .into_iter()
            .map(IngredientView::from)
            .collect(),
        directions: wire
            .directions
            .unwrap_or_default()
            .into_iter()
            .map(DirectionView::from)
            .collect(),
    })
}
