/// Tab Grouper - Chrome Extension that sorts tabs into groups with an LLM
/// Built with Rust + WASM + Yew

mod background;
mod chrome;
mod classifier;
mod dispatcher;
mod domain;
mod error;
mod filter;
mod host;
mod prompt;
mod provider;
mod reconciler;
mod storage;
mod tab_data;
pub mod ui;

#[cfg(test)]
mod testing;

use wasm_bindgen::prelude::*;

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

// Re-export the grouping key for JavaScript access
#[wasm_bindgen]
pub fn root_domain(url: &str) -> String {
    domain::root_domain(url).unwrap_or_default()
}

// Register the service worker listeners
#[wasm_bindgen]
pub fn start_background() {
    background::start();
}

// Start the Yew app for the popup
#[wasm_bindgen]
pub fn start_popup() {
    yew::Renderer::<ui::popup::App>::new().render();
}

// Start the Yew app for the options page
#[wasm_bindgen]
pub fn start_options() {
    yew::Renderer::<ui::options::Options>::new().render();
}
