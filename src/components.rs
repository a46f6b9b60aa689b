//! Pure Yew view components for the recipe page.
//!
//! Everything here renders from props; edits are reported through callbacks
//! and the controller decides what happens next.

use recipe_explorer::config::{
    AMOUNT_STEP, MAX_AMOUNT, MAX_TIME_LEVEL, MIN_AMOUNT, MIN_TIME_LEVEL, TIME_LEVEL_STEP,
};
use recipe_explorer::{ConnectionState, DirectionView, IngredientView, RecipeSnapshot};
use web_sys::HtmlInputElement;
use yew::prelude::*;

fn slider_input(onchange: Callback<f64>) -> Callback<InputEvent> {
    Callback::from(move |e: InputEvent| {
        let input: HtmlInputElement = e.target_unchecked_into();
        if let Ok(value) = input.value().parse::<f64>() {
            onchange.emit(value);
        }
    })
}

#[derive(Properties, PartialEq)]
pub struct AmountSliderProps {
    pub amount: f64,
    pub measure: String,
    pub onchange: Callback<f64>,
}

#[function_component(AmountSlider)]
pub fn amount_slider(props: &AmountSliderProps) -> Html {
    html! {
        <div class="form-group">
            <label for="amount">{ "Amount:" }</label>
            <div class="slider-with-value">
                <input type="range"
                    id="amount"
                    min={MIN_AMOUNT.to_string()}
                    max={MAX_AMOUNT.to_string()}
                    step={AMOUNT_STEP.to_string()}
                    value={props.amount.to_string()}
                    oninput={slider_input(props.onchange.clone())}
                />
                <span class="slider-value">{ format!("{} {}", props.amount, props.measure) }</span>
            </div>
        </div>
    }
}

/// Log-scale time budget. The label shows the budget in minutes, not the level.
#[derive(Properties, PartialEq)]
pub struct TimeSliderProps {
    pub level: f64,
    pub label: String,
    pub onchange: Callback<f64>,
}

#[function_component(TimeSlider)]
pub fn time_slider(props: &TimeSliderProps) -> Html {
    html! {
        <div class="form-group">
            <label for="timelimit">{ "Time Limit:" }</label>
            <div class="slider-with-value">
                <input type="range"
                    id="timelimit"
                    min={MIN_TIME_LEVEL.to_string()}
                    max={MAX_TIME_LEVEL.to_string()}
                    step={TIME_LEVEL_STEP.to_string()}
                    value={props.level.to_string()}
                    oninput={slider_input(props.onchange.clone())}
                />
                <span class="slider-value">{ props.label.clone() }</span>
            </div>
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct ConnectionBannerProps {
    pub state: ConnectionState,
}

/// Shown only while the connection is not open.
#[function_component(ConnectionBanner)]
pub fn connection_banner(props: &ConnectionBannerProps) -> Html {
    if props.state == ConnectionState::Open {
        return html! {};
    }
    let class = match props.state {
        ConnectionState::Exhausted | ConnectionState::Closed => "connection-status disconnected",
        _ => "connection-status pending",
    };
    html! {
        <div class={class}>{ format!("Server {}", props.state.label()) }</div>
    }
}

/// Ingredients the user chose to build, each removable with a click.
#[derive(Properties, PartialEq)]
pub struct OverrideChipsProps {
    pub names: Vec<String>,
    pub onremove: Callback<String>,
}

#[function_component(OverrideChips)]
pub fn override_chips(props: &OverrideChipsProps) -> Html {
    if props.names.is_empty() {
        return html! {};
    }
    html! {
        <div class="override-chips">
            <span class="override-label">{ "Making from scratch:" }</span>
            { props.names.iter().map(|name| {
                let onremove = props.onremove.clone();
                let owned = name.clone();
                html! {
                    <button class="chip" title="Buy it instead"
                        onclick={Callback::from(move |_| onremove.emit(owned.clone()))}>
                        { format!("{} \u{00d7}", name) }
                    </button>
                }
            }).collect::<Html>() }
        </div>
    }
}

/// Headline figures plus the version the server reported.
pub fn render_summary(snapshot: &RecipeSnapshot) -> Html {
    html! {
        <div class="recipe-summary">
            <h2>{ snapshot.recipe_name.clone() }</h2>
            <div class="summary-figures">
                <span class="total-cost" title={snapshot.total_cost.clone()}>
                    { snapshot.headline_cost() }
                </span>
                <span class="total-time">{ snapshot.total_time.clone() }</span>
            </div>
            if !snapshot.version.is_empty() {
                <div class="version">{ format!("Version {}", snapshot.version) }</div>
            }
        </div>
    }
}

/// Ingredient boxes. Clicking an expandable one asks to build it from scratch.
pub fn render_ingredients(ingredients: &[IngredientView], onexpand: &Callback<String>) -> Html {
    html! {
        <div class="ingredients">
            <h3>{ "Ingredients" }</h3>
            { ingredients.iter().map(|i| render_ingredient(i, onexpand)).collect::<Html>() }
        </div>
    }
}

fn render_ingredient(ingredient: &IngredientView, onexpand: &Callback<String>) -> Html {
    let class = if ingredient.is_expandable {
        "ingredient expandable"
    } else {
        "ingredient"
    };
    let onclick = ingredient.is_expandable.then(|| {
        let onexpand = onexpand.clone();
        let name = ingredient.name.clone();
        Callback::from(move |_: MouseEvent| onexpand.emit(name.clone()))
    });
    html! {
        <div class={class} title={ingredient.scratch_summary()} onclick={onclick}>
            <span class="ingredient-amount">{ ingredient.purchase_amount.clone() }</span>
            <span class="ingredient-name">{ ingredient.name.clone() }</span>
            <span class="ingredient-cost">{ ingredient.purchase_cost.clone() }</span>
        </div>
    }
}

pub fn render_directions(directions: &[DirectionView]) -> Html {
    html! {
        <div class="directions">
            <h3>{ "Directions" }</h3>
            { directions.iter().map(|group| html! {
                <div class="step-group">
                    <h4>
                        { group.step_group_name.clone() }
                        if !group.total_time.is_empty() {
                            <span class="step-time">{ format!(" ({})", group.total_time) }</span>
                        }
                    </h4>
                    <ol>
                        { group.instruction_lines.iter().map(|line| html! {
                            <li>{ line.clone() }</li>
                        }).collect::<Html>() }
                    </ol>
                </div>
            }).collect::<Html>() }
        </div>
    }
}

pub fn render_graph(path: &str) -> Html {
    if path.is_empty() {
        return html! {};
    }
    html! {
        <div class="dependency-graph">
            <img src={path.to_string()} alt="Recipe dependency graph" />
        </div>
    }
}
