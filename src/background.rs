/// Background service worker: wires browser events to the grouping service

use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::chrome::{ChromeHost, ChromeStorage};
use crate::dispatcher::GroupingService;
use crate::provider::HttpProviders;
use crate::tab_data::{TabChangeInfo, TabDetachInfo, TabGroupInfo, TabInfo};

// Import JS bridge functions
#[wasm_bindgen(module = "/background.js")]
extern "C" {
    fn onInstalled(callback: &js_sys::Function);
    fn onTabCreated(callback: &js_sys::Function);
    fn onTabUpdated(callback: &js_sys::Function);
    fn onTabDetached(callback: &js_sys::Function);
    fn onTabRemoved(callback: &js_sys::Function);
    fn onTabGroupUpdated(callback: &js_sys::Function);
}

type Service = GroupingService<ChromeHost, ChromeStorage, HttpProviders<ChromeStorage>>;

fn decode<T: serde::de::DeserializeOwned>(what: &str, value: JsValue) -> Option<T> {
    match serde_wasm_bindgen::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            log::error!("Failed to parse {}: {:?}", what, e);
            None
        }
    }
}

/// Build the service and register every listener. Closures live for the
/// lifetime of the worker.
pub fn start() {
    let service: Rc<Service> = Rc::new(GroupingService::new(
        ChromeHost,
        ChromeStorage,
        HttpProviders::new(reqwest::Client::new(), ChromeStorage),
    ));

    let installed = {
        let service = service.clone();
        Closure::wrap(Box::new(move |reason: JsValue| {
            log::info!("installed: {:?}", reason.as_string());
            let service = service.clone();
            spawn_local(async move {
                if let Err(e) = service.on_installed().await {
                    log::error!("Failed to seed defaults: {}", e);
                }
            });
        }) as Box<dyn Fn(JsValue)>)
    };
    onInstalled(installed.as_ref().unchecked_ref());
    installed.forget();

    let created = {
        let service = service.clone();
        Closure::wrap(Box::new(move |tab_js: JsValue| {
            let Some(tab) = decode::<TabInfo>("created tab", tab_js) else { return };
            let service = service.clone();
            spawn_local(async move {
                if let Err(e) = service.on_tab_created(&tab).await {
                    log::error!("Grouping new tab {} failed: {}", tab.id, e);
                }
            });
        }) as Box<dyn Fn(JsValue)>)
    };
    onTabCreated(created.as_ref().unchecked_ref());
    created.forget();

    let updated = {
        let service = service.clone();
        Closure::wrap(Box::new(move |_tab_id: i32, change_js: JsValue, tab_js: JsValue| {
            let Some(change) = decode::<TabChangeInfo>("change info", change_js) else { return };
            let Some(tab) = decode::<TabInfo>("updated tab", tab_js) else { return };
            let service = service.clone();
            spawn_local(async move {
                if let Err(e) = service.on_tab_updated(&change, &tab).await {
                    log::error!("Grouping updated tab {} failed: {}", tab.id, e);
                }
            });
        }) as Box<dyn Fn(i32, JsValue, JsValue)>)
    };
    onTabUpdated(updated.as_ref().unchecked_ref());
    updated.forget();

    let detached = {
        let service = service.clone();
        Closure::wrap(Box::new(move |tab_id: i32, detach_js: JsValue| {
            let Some(detach) = decode::<TabDetachInfo>("detach info", detach_js) else { return };
            let service = service.clone();
            spawn_local(async move {
                if let Err(e) = service.on_tab_detached(tab_id, &detach).await {
                    log::error!("Detach cleanup for tab {} failed: {}", tab_id, e);
                }
            });
        }) as Box<dyn Fn(i32, JsValue)>)
    };
    onTabDetached(detached.as_ref().unchecked_ref());
    detached.forget();

    let removed = {
        let service = service.clone();
        Closure::wrap(Box::new(move |tab_id: i32| {
            service.on_tab_removed(tab_id);
        }) as Box<dyn Fn(i32)>)
    };
    onTabRemoved(removed.as_ref().unchecked_ref());
    removed.forget();

    let group_updated = {
        let service = service.clone();
        Closure::wrap(Box::new(move |group_js: JsValue| {
            let Some(group) = decode::<TabGroupInfo>("tab group", group_js) else { return };
            let service = service.clone();
            spawn_local(async move {
                if let Err(e) = service.on_tab_group_updated(&group).await {
                    log::error!("Reconciling group {} failed: {}", group.id, e);
                }
            });
        }) as Box<dyn Fn(JsValue)>)
    };
    onTabGroupUpdated(group_updated.as_ref().unchecked_ref());
    group_updated.forget();

    log::info!("Tab Grouper background started");
}
