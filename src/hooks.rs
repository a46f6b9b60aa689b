use log::error;
use recipe_explorer::browser::{connect_to_current_page, BrowserController};
use recipe_explorer::{ViewListener, ViewState};
use std::cell::RefCell;
use std::rc::Rc;
use yew::prelude::*;

/// Latest view plus the callbacks that feed edits back to the controller.
#[derive(Clone)]
pub struct RecipeSync {
    /// `None` until the controller publishes its first view.
    pub view: Option<ViewState>,
    /// Set when the page URL cannot be turned into a recipe.
    pub startup_error: Option<String>,
    pub set_amount: Callback<f64>,
    pub set_time_level: Callback<f64>,
    pub add_override: Callback<String>,
    pub remove_override: Callback<String>,
}

fn with_controller(
    slot: &Rc<RefCell<Option<BrowserController>>>,
    f: impl FnOnce(&BrowserController),
) {
    if let Some(controller) = slot.borrow().as_ref() {
        f(controller);
    }
}

/// Owns the sync controller for the lifetime of the component. The controller
/// is built and connected on mount and closed on unmount.
#[hook]
pub fn use_recipe_sync() -> RecipeSync {
    let view = use_state(|| None::<ViewState>);
    let startup_error = use_state(|| None::<String>);
    let controller = use_mut_ref(|| None::<BrowserController>);

    {
        let view = view.clone();
        let startup_error = startup_error.clone();
        let controller = controller.clone();
        use_effect_with((), move |_| {
            let listener: ViewListener = Rc::new(move |next: ViewState| view.set(Some(next)));
            match connect_to_current_page(listener) {
                Ok(created) => {
                    created.start();
                    *controller.borrow_mut() = Some(created);
                }
                Err(e) => {
                    error!("cannot start recipe sync: {}", e);
                    startup_error.set(Some(e.to_string()));
                }
            }
            move || {
                let taken = controller.borrow_mut().take();
                if let Some(taken) = taken {
                    taken.close();
                }
            }
        });
    }

    let set_amount = {
        let controller = controller.clone();
        Callback::from(move |value: f64| with_controller(&controller, |c| c.set_amount(value)))
    };
    let set_time_level = {
        let controller = controller.clone();
        Callback::from(move |value: f64| with_controller(&controller, |c| c.set_time_level(value)))
    };
    let add_override = {
        let controller = controller.clone();
        Callback::from(move |name: String| with_controller(&controller, |c| c.add_override(&name)))
    };
    let remove_override = {
        let controller = controller.clone();
        Callback::from(move |name: String| {
            with_controller(&controller, |c| c.remove_override(&name))
        })
    };

    RecipeSync {
        view: (*view).clone(),
        startup_error: (*startup_error).clone(),
        set_amount,
        set_time_level,
        add_override,
        remove_override,
    }
}
