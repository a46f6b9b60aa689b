//! Main module for the Recipe Explorer application using Yew.
//! Wires the sync hook to the view components.

use recipe_explorer::SyncPhase;
use yew::prelude::*;

mod components;
mod hooks;

use components::{
    render_directions, render_graph, render_ingredients, render_summary, AmountSlider,
    ConnectionBanner, OverrideChips, TimeSlider,
};
use hooks::use_recipe_sync;

/// Primary application component.
#[function_component]
pub fn App() -> Html {
    let sync = use_recipe_sync();

    if let Some(ref err) = sync.startup_error {
        return html! {
            <div class="container">
                <div class="current-error">{ err }</div>
            </div>
        };
    }

    let Some(view) = sync.view.clone() else {
        return html! {
            <div class="container"><div class="loading">{ "Loading..." }</div></div>
        };
    };

    let overrides: Vec<String> = view.params.overrides.keys().to_vec();

    html! {
        <div class="container">
            <ConnectionBanner state={view.connection} />

            <div class="controls">
                <AmountSlider
                    amount={view.params.amount}
                    measure={view.measure().to_string()}
                    onchange={sync.set_amount.clone()}
                />
                <TimeSlider
                    level={view.params.time_level}
                    label={view.time_budget_label()}
                    onchange={sync.set_time_level.clone()}
                />
                <OverrideChips names={overrides} onremove={sync.remove_override.clone()} />
            </div>

            if let Some(ref err) = view.last_error {
                <div class="current-error compact">{ err }</div>
            }

            <div class="results-area">
                if let Some(ref snapshot) = view.snapshot {
                    { render_summary(snapshot) }
                    { render_ingredients(&snapshot.ingredients, &sync.add_override) }
                    { render_directions(&snapshot.directions_or_purchase()) }
                    { render_graph(&snapshot.dependency_graph_ref) }
                }
                if view.phase == SyncPhase::Loading {
                    <div class="loading">{ format!("Loading {}...", view.params.recipe_id) }</div>
                }
            </div>
        </div>
    }
}

/// Entry point: installs the panic hook and logger, then renders the App.
fn main() {
    console_error_panic_hook::set_once();
    let level = if cfg!(debug_assertions) {
        log::Level::Debug
    } else {
        log::Level::Info
    };
    wasm_logger::init(wasm_logger::Config::new(level));
    yew::Renderer::<App>::new().render();
}
