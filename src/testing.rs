//! In-memory stand-ins for chrome.storage, the tab APIs and the providers

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

use crate::error::{HostError, ProviderError, StorageError};
use crate::host::TabHost;
use crate::provider::{Classify, ProviderFactory};
use crate::storage::{KeyValueStore, Settings};
use crate::tab_data::{
    ClassifyInput, GroupId, TAB_GROUP_ID_NONE, TabColor, TabGroupInfo, TabId, TabInfo, WindowId,
    WindowType,
};

#[derive(Default)]
pub struct MemoryStore {
    values: RefCell<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn with(entries: &[(&str, Value)]) -> MemoryStore {
        let store = MemoryStore::default();
        for (key, value) in entries {
            store.values.borrow_mut().insert(key.to_string(), value.clone());
        }
        store
    }

    pub fn value(&self, key: &str) -> Option<Value> {
        self.values.borrow().get(key).cloned()
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.values.borrow().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.values.borrow_mut().insert(key.to_string(), value);
        Ok(())
    }
}

/// Answers by URL; fails for URLs it was not scripted with
#[derive(Clone, Default)]
pub struct ScriptedProvider {
    answers: Rc<HashMap<String, String>>,
    requested: Rc<RefCell<Vec<String>>>,
}

impl ScriptedProvider {
    pub fn new(answers: &[(&str, &str)]) -> ScriptedProvider {
        ScriptedProvider {
            answers: Rc::new(
                answers
                    .iter()
                    .map(|(url, answer)| (url.to_string(), answer.to_string()))
                    .collect(),
            ),
            requested: Rc::default(),
        }
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requested.borrow().clone()
    }
}

impl Classify for ScriptedProvider {
    async fn classify(
        &self,
        tab: &ClassifyInput,
        _categories: &[String],
        _api_key: &str,
    ) -> Result<String, ProviderError> {
        self.requested.borrow_mut().push(tab.url.clone());
        self.answers
            .get(&tab.url)
            .cloned()
            .ok_or_else(|| ProviderError::Network(format!("no route to {}", tab.url)))
    }
}

impl ProviderFactory for ScriptedProvider {
    type Output = ScriptedProvider;

    fn build(&self, _settings: &Settings) -> ScriptedProvider {
        self.clone()
    }
}

/// A browser with windows, tabs and groups that behaves like `chrome.*`:
/// groups disappear once their last tab leaves.
#[derive(Default)]
pub struct FakeHost {
    tabs: RefCell<Vec<TabInfo>>,
    groups: RefCell<Vec<TabGroupInfo>>,
    windows: RefCell<HashMap<WindowId, WindowType>>,
    next_group_id: RefCell<GroupId>,
    pub refuse_group_creation: RefCell<bool>,
    pub groups_created: RefCell<usize>,
    pub moves: RefCell<Vec<(GroupId, i32)>>,
}

impl FakeHost {
    pub fn new() -> FakeHost {
        let host = FakeHost::default();
        *host.next_group_id.borrow_mut() = 100;
        host
    }

    pub fn add_window(&self, window_id: WindowId, window_type: WindowType) {
        self.windows.borrow_mut().insert(window_id, window_type);
    }

    /// Appends the tab at the end of its window's strip
    pub fn add_tab(&self, mut tab: TabInfo) {
        self.windows
            .borrow_mut()
            .entry(tab.window_id)
            .or_insert(WindowType::Normal);
        let mut tabs = self.tabs.borrow_mut();
        tab.index = tabs.iter().filter(|t| t.window_id == tab.window_id).count() as i32;
        tabs.push(tab);
    }

    /// A group created outside the extension, e.g. by the user
    pub fn add_group(&self, window_id: WindowId, title: &str, tab_ids: &[TabId]) -> GroupId {
        let id = self.allocate_group_id();
        self.groups.borrow_mut().push(TabGroupInfo {
            id,
            title: Some(title.to_string()),
            color: Some(TabColor::Grey),
            window_id,
            collapsed: false,
        });
        for tab in self.tabs.borrow_mut().iter_mut() {
            if tab_ids.contains(&tab.id) {
                tab.group_id = id;
            }
        }
        id
    }

    pub fn remove_tab(&self, tab_id: TabId) {
        self.tabs.borrow_mut().retain(|t| t.id != tab_id);
        self.prune_empty_groups();
    }

    pub fn set_url(&self, tab_id: TabId, url: &str) {
        if let Some(tab) = self.tabs.borrow_mut().iter_mut().find(|t| t.id == tab_id) {
            tab.url = Some(url.to_string());
        }
    }

    pub fn tab(&self, tab_id: TabId) -> TabInfo {
        self.tabs
            .borrow()
            .iter()
            .find(|t| t.id == tab_id)
            .cloned()
            .expect("tab exists")
    }

    pub fn group(&self, group_id: GroupId) -> Option<TabGroupInfo> {
        self.groups.borrow().iter().find(|g| g.id == group_id).cloned()
    }

    pub fn groups_titled(&self, window_id: WindowId, title: &str) -> Vec<TabGroupInfo> {
        self.groups
            .borrow()
            .iter()
            .filter(|g| g.window_id == window_id && g.title.as_deref() == Some(title))
            .cloned()
            .collect()
    }

    pub fn group_count(&self) -> usize {
        self.groups.borrow().len()
    }

    fn allocate_group_id(&self) -> GroupId {
        let mut next = self.next_group_id.borrow_mut();
        *next += 1;
        *next
    }

    /// `tabs.group` into an existing group moves the tabs right after it
    fn place_after_group(&self, tab_ids: &[TabId], group_id: GroupId, window_id: WindowId) {
        let mut tabs = self.tabs.borrow_mut();
        let mut strip: Vec<&TabInfo> = tabs.iter().filter(|t| t.window_id == window_id).collect();
        strip.sort_by_key(|t| t.index);

        let (moving, mut order): (Vec<&TabInfo>, Vec<&TabInfo>) =
            strip.into_iter().partition(|t| tab_ids.contains(&t.id));
        let at = order
            .iter()
            .rposition(|t| t.group_id == group_id)
            .map_or(order.len(), |p| p + 1);
        order.splice(at..at, moving);

        let indices: Vec<(TabId, i32)> = order
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id, i as i32))
            .collect();
        for (id, index) in indices {
            if let Some(tab) = tabs.iter_mut().find(|t| t.id == id) {
                tab.index = index;
            }
        }
    }

    fn prune_empty_groups(&self) {
        let tabs = self.tabs.borrow();
        self.groups
            .borrow_mut()
            .retain(|g| tabs.iter().any(|t| t.group_id == g.id));
    }
}

impl TabHost for FakeHost {
    async fn get_tab(&self, tab_id: TabId) -> Result<TabInfo, HostError> {
        self.tabs
            .borrow()
            .iter()
            .find(|t| t.id == tab_id)
            .cloned()
            .ok_or_else(|| HostError::Call {
                call: "tabs.get",
                message: format!("No tab with id: {}.", tab_id),
            })
    }

    async fn window_tabs(&self, window_id: WindowId) -> Result<Vec<TabInfo>, HostError> {
        let mut tabs: Vec<TabInfo> = self
            .tabs
            .borrow()
            .iter()
            .filter(|t| t.window_id == window_id)
            .cloned()
            .collect();
        tabs.sort_by_key(|t| t.index);
        Ok(tabs)
    }

    async fn group_tabs_of(&self, group_id: GroupId) -> Result<Vec<TabInfo>, HostError> {
        Ok(self
            .tabs
            .borrow()
            .iter()
            .filter(|t| t.group_id == group_id)
            .cloned()
            .collect())
    }

    async fn window_groups(&self, window_id: WindowId) -> Result<Vec<TabGroupInfo>, HostError> {
        Ok(self
            .groups
            .borrow()
            .iter()
            .filter(|g| g.window_id == window_id)
            .cloned()
            .collect())
    }

    async fn window_type(&self, window_id: WindowId) -> Result<WindowType, HostError> {
        self.windows
            .borrow()
            .get(&window_id)
            .copied()
            .ok_or_else(|| HostError::Call {
                call: "windows.get",
                message: format!("No window with id: {}.", window_id),
            })
    }

    async fn group_tabs(
        &self,
        tab_ids: &[TabId],
        group_id: Option<GroupId>,
        window_id: WindowId,
    ) -> Result<Option<GroupId>, HostError> {
        let target = match group_id {
            Some(id) => {
                if self.group(id).is_none() {
                    return Err(HostError::Call {
                        call: "tabs.group",
                        message: format!("No group with id: {}.", id),
                    });
                }
                self.place_after_group(tab_ids, id, window_id);
                id
            }
            None => {
                if *self.refuse_group_creation.borrow() {
                    return Ok(None);
                }
                let id = self.allocate_group_id();
                *self.groups_created.borrow_mut() += 1;
                self.groups.borrow_mut().push(TabGroupInfo {
                    id,
                    title: None,
                    color: Some(TabColor::Grey),
                    window_id,
                    collapsed: false,
                });
                id
            }
        };

        for tab in self.tabs.borrow_mut().iter_mut() {
            if tab_ids.contains(&tab.id) {
                tab.group_id = target;
            }
        }
        self.prune_empty_groups();
        Ok(Some(target))
    }

    async fn ungroup_tabs(&self, tab_ids: &[TabId]) -> Result<(), HostError> {
        for tab in self.tabs.borrow_mut().iter_mut() {
            if tab_ids.contains(&tab.id) {
                tab.group_id = TAB_GROUP_ID_NONE;
            }
        }
        self.prune_empty_groups();
        Ok(())
    }

    async fn update_group(
        &self,
        group_id: GroupId,
        title: &str,
        color: Option<TabColor>,
    ) -> Result<(), HostError> {
        let mut groups = self.groups.borrow_mut();
        let group = groups
            .iter_mut()
            .find(|g| g.id == group_id)
            .ok_or_else(|| HostError::Call {
                call: "tabGroups.update",
                message: format!("No group with id: {}.", group_id),
            })?;
        group.title = Some(title.to_string());
        if color.is_some() {
            group.color = color;
        }
        Ok(())
    }

    async fn move_group(&self, group_id: GroupId, index: i32) -> Result<(), HostError> {
        self.moves.borrow_mut().push((group_id, index));
        Ok(())
    }
}
