#![cfg(target_arch = "wasm32")]

use recipe_explorer::browser::{current_location, BrowserHistory, WebSocketConnector};
use recipe_explorer::transport::{Connector, SocketEvent, SocketEventSink};
use recipe_explorer::url_state::decode;
use recipe_explorer::{HistorySink, TransportError};
use std::rc::Rc;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn location_is_an_absolute_http_url() {
    let page = current_location().unwrap();
    assert!(page.scheme().starts_with("http"));
}

#[wasm_bindgen_test]
fn replaced_url_is_decodable() {
    BrowserHistory.replace_url("/recipe/pancakes?amount=3&timelimit=60&ingredientsToBuild=flour");

    let page = current_location().unwrap();
    assert_eq!(page.path(), "/recipe/pancakes");

    let params = decode(&page).unwrap();
    assert_eq!(params.recipe_id, "pancakes");
    assert_eq!(params.amount, 3.0);
    assert!(params.overrides.contains("flour"));
}

#[wasm_bindgen_test]
fn malformed_socket_url_fails_to_connect() {
    let sink: SocketEventSink = Rc::new(|_: SocketEvent| {});
    let result = WebSocketConnector.connect("not a socket url", sink);
    assert!(matches!(result, Err(TransportError::Connect { .. })));
}
