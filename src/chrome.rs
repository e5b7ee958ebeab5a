/// `chrome.*` implementations of the host and storage traits, through the
/// JS bridge in `chrome.js`

use serde::Serialize;
use serde::de::DeserializeOwned;
use wasm_bindgen::prelude::*;

use crate::error::{HostError, StorageError};
use crate::host::TabHost;
use crate::storage::KeyValueStore;
use crate::tab_data::{GroupId, TabColor, TabGroupInfo, TabId, TabInfo, WindowId, WindowType};

// Import JS bridge functions
#[wasm_bindgen(module = "/chrome.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn getStorage(key: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn setStorage(key: &str, value: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn getTab(tab_id: i32) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn queryWindowTabs(window_id: i32) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn queryGroupTabs(group_id: i32) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn queryWindowGroups(window_id: i32) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn getWindowType(window_id: i32) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn getCurrentWindowId() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn groupTabs(tab_ids: JsValue, group_id: Option<i32>, window_id: i32) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn ungroupTabs(tab_ids: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn updateGroup(group_id: i32, title: &str, color: Option<String>) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn moveGroup(group_id: i32, index: i32) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn openOptionsPage() -> Result<(), JsValue>;
}

fn call_error(call: &'static str, e: JsValue) -> HostError {
    HostError::Call {
        call,
        message: format!("{:?}", e),
    }
}

fn decode<T: DeserializeOwned>(call: &'static str, value: JsValue) -> Result<T, HostError> {
    serde_wasm_bindgen::from_value(value).map_err(|e| HostError::Decode {
        call,
        message: format!("{:?}", e),
    })
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, String> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| format!("Failed to serialize: {:?}", e))
}

/// Window the popup was opened from
pub async fn current_window_id() -> Result<WindowId, HostError> {
    let id = getCurrentWindowId()
        .await
        .map_err(|e| call_error("windows.getCurrent", e))?;
    decode("windows.getCurrent", id)
}

pub async fn open_options_page() -> Result<(), HostError> {
    openOptionsPage()
        .await
        .map_err(|e| call_error("runtime.openOptionsPage", e))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeStorage;

impl KeyValueStore for ChromeStorage {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError> {
        let value = getStorage(key)
            .await
            .map_err(|e| StorageError::Access(format!("Failed to get storage: {:?}", e)))?;

        if value.is_null() || value.is_undefined() {
            return Ok(None);
        }
        serde_wasm_bindgen::from_value(value)
            .map(Some)
            .map_err(|e| StorageError::Serde {
                key: key.to_string(),
                message: format!("{:?}", e),
            })
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), StorageError> {
        let value = to_js(&value).map_err(|message| StorageError::Serde {
            key: key.to_string(),
            message,
        })?;

        setStorage(key, value)
            .await
            .map_err(|e| StorageError::Access(format!("Failed to save storage: {:?}", e)))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeHost;

impl TabHost for ChromeHost {
    async fn get_tab(&self, tab_id: TabId) -> Result<TabInfo, HostError> {
        let tab = getTab(tab_id).await.map_err(|e| call_error("tabs.get", e))?;
        decode("tabs.get", tab)
    }

    async fn window_tabs(&self, window_id: WindowId) -> Result<Vec<TabInfo>, HostError> {
        let tabs = queryWindowTabs(window_id)
            .await
            .map_err(|e| call_error("tabs.query", e))?;
        decode("tabs.query", tabs)
    }

    async fn group_tabs_of(&self, group_id: GroupId) -> Result<Vec<TabInfo>, HostError> {
        let tabs = queryGroupTabs(group_id)
            .await
            .map_err(|e| call_error("tabs.query", e))?;
        decode("tabs.query", tabs)
    }

    async fn window_groups(&self, window_id: WindowId) -> Result<Vec<TabGroupInfo>, HostError> {
        let groups = queryWindowGroups(window_id)
            .await
            .map_err(|e| call_error("tabGroups.query", e))?;
        decode("tabGroups.query", groups)
    }

    async fn window_type(&self, window_id: WindowId) -> Result<WindowType, HostError> {
        let window_type = getWindowType(window_id)
            .await
            .map_err(|e| call_error("windows.get", e))?;
        decode("windows.get", window_type)
    }

    async fn group_tabs(
        &self,
        tab_ids: &[TabId],
        group_id: Option<GroupId>,
        window_id: WindowId,
    ) -> Result<Option<GroupId>, HostError> {
        let ids = to_js(tab_ids).map_err(|message| HostError::Decode {
            call: "tabs.group",
            message,
        })?;
        let result = groupTabs(ids, group_id, window_id)
            .await
            .map_err(|e| call_error("tabs.group", e))?;

        if result.is_null() || result.is_undefined() {
            return Ok(None);
        }
        decode("tabs.group", result).map(Some)
    }

    async fn ungroup_tabs(&self, tab_ids: &[TabId]) -> Result<(), HostError> {
        let ids = to_js(tab_ids).map_err(|message| HostError::Decode {
            call: "tabs.ungroup",
            message,
        })?;
        ungroupTabs(ids).await.map_err(|e| call_error("tabs.ungroup", e))
    }

    async fn update_group(
        &self,
        group_id: GroupId,
        title: &str,
        color: Option<TabColor>,
    ) -> Result<(), HostError> {
        updateGroup(group_id, title, color.map(|c| c.name().to_string()))
            .await
            .map_err(|e| call_error("tabGroups.update", e))
    }

    async fn move_group(&self, group_id: GroupId, index: i32) -> Result<(), HostError> {
        moveGroup(group_id, index)
            .await
            .map_err(|e| call_error("tabGroups.move", e))
    }
}
