//! Exported entry points, run in a browser with `wasm-pack test --headless`

#![cfg(target_arch = "wasm32")]

use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn root_domain_drops_subdomain() {
    assert_eq!(tab_grouper::root_domain("https://www.github.com/rust-lang"), "github.com");
    assert_eq!(tab_grouper::root_domain("https://github.com"), "github.com");
}

#[wasm_bindgen_test]
fn root_domain_of_unparsable_url_is_empty() {
    assert_eq!(tab_grouper::root_domain("not a url"), "");
}
