//! `web_sys` bindings: the real websocket, the history API and the page
//! location. Everything above this module is testable without a browser.

use crate::config::SyncConfig;
use crate::controller::{HistorySink, SyncController, ViewListener};
use crate::error::{StartupError, TransportError};
use crate::timer::GlooScheduler;
use crate::transport::{Connector, Socket, SocketEvent, SocketEventSink};
use log::{debug, warn};
use std::cell::Cell;
use url::Url;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CloseEvent, Event, MessageEvent, WebSocket};

pub type BrowserController = SyncController<WebSocketConnector, GlooScheduler>;

fn js_reason(value: &JsValue) -> String {
    value
        .as_string()
        .unwrap_or_else(|| format!("{:?}", value))
}

/// Opens `web_sys::WebSocket`s.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
    type Socket = BrowserSocket;

    fn connect(&self, url: &str, sink: SocketEventSink) -> Result<BrowserSocket, TransportError> {
        let ws = WebSocket::new(url).map_err(|e| TransportError::Connect {
            url: url.to_string(),
            reason: js_reason(&e),
        })?;

        let on_open = {
            let sink = sink.clone();
            Closure::<dyn FnMut(Event)>::new(move |_: Event| sink(SocketEvent::Opened))
        };
        let on_message = {
            let sink = sink.clone();
            Closure::<dyn FnMut(MessageEvent)>::new(move |e: MessageEvent| {
                match e.data().as_string() {
                    Some(text) => sink(SocketEvent::Message(text)),
                    None => debug!("ignoring non-text frame"),
                }
            })
        };
        let on_close = {
            let sink = sink.clone();
            Closure::<dyn FnMut(CloseEvent)>::new(move |e: CloseEvent| {
                sink(SocketEvent::Closed {
                    code: e.code(),
                    reason: e.reason(),
                })
            })
        };
        let on_error = Closure::<dyn FnMut(Event)>::new(move |e: Event| {
            sink(SocketEvent::Error(format!("websocket {} event", e.type_())))
        });

        ws.set_onopen(Some(on_open.as_ref().unchecked_ref()));
        ws.set_onmessage(Some(on_message.as_ref().unchecked_ref()));
        ws.set_onclose(Some(on_close.as_ref().unchecked_ref()));
        ws.set_onerror(Some(on_error.as_ref().unchecked_ref()));

        Ok(BrowserSocket {
            ws,
            closed: Cell::new(false),
            _on_open: on_open,
            _on_message: on_message,
            _on_close: on_close,
            _on_error: on_error,
        })
    }
}

/// A live websocket and the callbacks bound to it. The callbacks are detached
/// before the socket is closed so a late event never reaches a dropped closure.
pub struct BrowserSocket {
    ws: WebSocket,
    closed: Cell<bool>,
    _on_open: Closure<dyn FnMut(Event)>,
    _on_message: Closure<dyn FnMut(MessageEvent)>,
    _on_close: Closure<dyn FnMut(CloseEvent)>,
    _on_error: Closure<dyn FnMut(Event)>,
}

impl Socket for BrowserSocket {
    fn send(&self, text: &str) -> Result<(), TransportError> {
        self.ws
            .send_with_str(text)
            .map_err(|e| TransportError::Send(js_reason(&e)))
    }

    fn close(&self) {
        if self.closed.replace(true) {
            return;
        }
        self.ws.set_onopen(None);
        self.ws.set_onmessage(None);
        self.ws.set_onclose(None);
        self.ws.set_onerror(None);
        if let Err(e) = self.ws.close() {
            warn!("closing websocket: {}", js_reason(&e));
        }
    }
}

impl Drop for BrowserSocket {
    fn drop(&mut self) {
        self.close();
    }
}

/// Rewrites the address bar with `history.replaceState`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserHistory;

impl HistorySink for BrowserHistory {
    fn replace_url(&self, url: &str) {
        let result = gloo_utils::window()
            .history()
            .and_then(|history| history.replace_state_with_url(&JsValue::NULL, "", Some(url)));
        if let Err(e) = result {
            warn!("could not rewrite url to {}: {}", url, js_reason(&e));
        }
    }
}

pub fn current_location() -> Result<Url, StartupError> {
    let href = gloo_utils::window()
        .location()
        .href()
        .map_err(|_| StartupError::NoLocation)?;
    Ok(Url::parse(&href)?)
}

/// Build a controller for the page the app is running on. Call
/// [`SyncController::start`] on the result to connect.
pub fn connect_to_current_page(listener: ViewListener) -> Result<BrowserController, StartupError> {
    let page = current_location()?;
    SyncController::for_page(
        &page,
        WebSocketConnector,
        GlooScheduler,
        Box::new(BrowserHistory),
        SyncConfig::default(),
        listener,
    )
}
