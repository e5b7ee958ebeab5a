/// Maps classification results onto live tab groups
///
/// Group ids and titles are only unique within a window, so the reconciler
/// keeps one `category → group id` index per window. The index is a cache: it
/// is rebuilt from the browser's live groups before every decision, which
/// also drops entries for groups that were closed or renamed behind our back.
///
/// Groups the user titled by hand are tracked separately ("manual" groups).
/// Their titles are folded into the category list and their tabs are left
/// alone by automatic grouping.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use crate::error::GroupingError;
use crate::host::TabHost;
use crate::storage::{self, KeyValueStore, Settings};
use crate::tab_data::{GroupId, TabColor, TabGroupInfo, TabId, TabInfo, WindowId};

/// Per-assignment knobs taken from the settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AssignOptions {
    /// Applied to newly created groups only
    pub color: Option<TabColor>,
    pub auto_position: bool,
}

impl AssignOptions {
    pub fn for_category(settings: &Settings, category: &str) -> AssignOptions {
        let color = settings
            .colors_enabled
            .then(|| settings.color_for(category).unwrap_or_else(TabColor::random));
        AssignOptions {
            color,
            auto_position: settings.is_auto_position,
        }
    }
}

pub struct GroupReconciler<H> {
    host: H,
    window_index: RefCell<HashMap<WindowId, HashMap<String, GroupId>>>,
    /// group id → last title seen for groups the user titled
    manual_groups: RefCell<HashMap<GroupId, String>>,
    /// group id → title this reconciler set; its own update events are not manual edits
    applied_titles: RefCell<HashMap<GroupId, String>>,
}

impl<H: TabHost> GroupReconciler<H> {
    pub fn new(host: H) -> Self {
        GroupReconciler {
            host,
            window_index: RefCell::new(HashMap::new()),
            manual_groups: RefCell::new(HashMap::new()),
            applied_titles: RefCell::new(HashMap::new()),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Cached group id for `category` in `window_id`, without refreshing
    pub fn indexed_group(&self, window_id: WindowId, category: &str) -> Option<GroupId> {
        self.window_index
            .borrow()
            .get(&window_id)
            .and_then(|index| index.get(category).copied())
    }

    pub fn has_window_index(&self, window_id: WindowId) -> bool {
        self.window_index.borrow().contains_key(&window_id)
    }

    pub fn is_manual_group(&self, group_id: GroupId) -> bool {
        self.manual_groups.borrow().contains_key(&group_id)
    }

    /// Rebuild a window's index from the browser's live groups. Groups that
    /// were indexed but are gone are dropped from the registries as well.
    pub async fn refresh_window(&self, window_id: WindowId) -> Result<(), GroupingError> {
        let groups = self.host.window_groups(window_id).await?;

        let mut fresh: HashMap<String, GroupId> = HashMap::new();
        for group in &groups {
            if let Some(title) = group.category() {
                fresh.entry(title.to_string()).or_insert(group.id);
            }
        }

        let closed: Vec<GroupId> = self
            .window_index
            .borrow()
            .get(&window_id)
            .map(|index| {
                index
                    .values()
                    .filter(|id| !groups.iter().any(|g| g.id == **id))
                    .copied()
                    .collect()
            })
            .unwrap_or_default();
        self.forget_groups(&closed);

        log::debug!("window {} has {} titled groups", window_id, fresh.len());
        self.window_index.borrow_mut().insert(window_id, fresh);
        Ok(())
    }

    fn forget_groups(&self, group_ids: &[GroupId]) {
        if group_ids.is_empty() {
            return;
        }
        log::debug!("forgetting closed groups {:?}", group_ids);
        let mut manual = self.manual_groups.borrow_mut();
        let mut applied = self.applied_titles.borrow_mut();
        for id in group_ids {
            manual.remove(id);
            applied.remove(id);
        }
    }

    fn record(&self, window_id: WindowId, category: &str, group_id: GroupId) {
        self.window_index
            .borrow_mut()
            .entry(window_id)
            .or_default()
            .insert(category.to_string(), group_id);
    }

    fn forget(&self, window_id: WindowId, category: &str) {
        if let Some(index) = self.window_index.borrow_mut().get_mut(&window_id) {
            index.remove(category);
        }
    }

    async fn title_group(
        &self,
        group_id: GroupId,
        category: &str,
        color: Option<TabColor>,
    ) -> Result<(), GroupingError> {
        // Recorded first: the browser may report the update before the call resolves
        self.applied_titles
            .borrow_mut()
            .insert(group_id, category.to_string());
        self.host.update_group(group_id, category, color).await?;
        Ok(())
    }

    /// Put `tab_ids` (all in `window_id`) into the window's group for
    /// `category`, creating and titling the group if there is none
    async fn group_into_category(
        &self,
        window_id: WindowId,
        tab_ids: &[TabId],
        category: &str,
        color: Option<TabColor>,
    ) -> Result<GroupId, GroupingError> {
        self.refresh_window(window_id).await?;

        if let Some(group_id) = self.indexed_group(window_id, category) {
            match self.host.group_tabs(tab_ids, Some(group_id), window_id).await {
                Ok(_) => return Ok(group_id),
                // Closed between the refresh and now
                Err(e) => {
                    log::warn!("group {} for {:?} went away: {}", group_id, category, e);
                    self.forget(window_id, category);
                    self.forget_groups(&[group_id]);
                }
            }
        }

        let group_id = self
            .host
            .group_tabs(tab_ids, None, window_id)
            .await?
            .ok_or_else(|| GroupingError::GroupCreation {
                tab_ids: tab_ids.to_vec(),
                window_id,
            })?;

        self.title_group(group_id, category, color).await?;
        self.record(window_id, category, group_id);
        log::info!("created group {} {:?} in window {}", group_id, category, window_id);
        Ok(group_id)
    }

    /// Move a tab into its window's group for `category`
    pub async fn assign_tab_to_group(
        &self,
        tab: &TabInfo,
        category: &str,
        options: AssignOptions,
    ) -> Result<GroupId, GroupingError> {
        self.window_index
            .borrow_mut()
            .entry(tab.window_id)
            .or_default();

        // Grouping pulls the tab next to its group, so look before grouping
        let was_rightmost = options.auto_position && self.is_rightmost(tab).await?;

        let group_id = self
            .group_into_category(tab.window_id, &[tab.id], category, options.color)
            .await?;

        if was_rightmost {
            log::debug!("moving group {} to the end of window {}", group_id, tab.window_id);
            self.host.move_group(group_id, -1).await?;
        }
        Ok(group_id)
    }

    async fn is_rightmost(&self, tab: &TabInfo) -> Result<bool, GroupingError> {
        let tabs = self.host.window_tabs(tab.window_id).await?;
        Ok(tabs.iter().max_by_key(|t| t.index).map(|t| t.id) == Some(tab.id))
    }

    /// Group tabs already classified into one category: one browser call per
    /// window. Windows are processed independently; the first failure is
    /// returned after the rest have been tried.
    pub async fn assign_many_tabs_to_type(
        &self,
        category: &str,
        tab_ids: &[TabId],
        options: AssignOptions,
    ) -> Result<Vec<GroupId>, GroupingError> {
        let mut by_window: Vec<(WindowId, Vec<TabId>)> = Vec::new();
        for &tab_id in tab_ids {
            let tab = match self.host.get_tab(tab_id).await {
                Ok(tab) => tab,
                Err(e) => {
                    log::warn!("skipping tab {}: {}", tab_id, e);
                    continue;
                }
            };
            match by_window.iter_mut().find(|(w, _)| *w == tab.window_id) {
                Some((_, ids)) => ids.push(tab_id),
                None => by_window.push((tab.window_id, vec![tab_id])),
            }
        }

        let mut groups = Vec::new();
        let mut first_error = None;
        for (window_id, ids) in by_window {
            match self
                .group_into_category(window_id, &ids, category, options.color)
                .await
            {
                Ok(group_id) => groups.push(group_id),
                Err(e) => {
                    log::error!("grouping {:?} in window {} failed: {}", category, window_id, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(groups),
        }
    }

    /// Ungroup every tab in the window; returns how many tabs were ungrouped
    pub async fn ungroup_all(&self, window_id: WindowId) -> Result<usize, GroupingError> {
        let grouped: Vec<TabId> = self
            .host
            .window_tabs(window_id)
            .await?
            .iter()
            .filter(|t| t.is_grouped())
            .map(|t| t.id)
            .collect();

        if !grouped.is_empty() {
            self.host.ungroup_tabs(&grouped).await?;
        }
        let dropped = self.window_index.borrow_mut().remove(&window_id);
        if let Some(index) = dropped {
            self.forget_groups(&index.into_values().collect::<Vec<_>>());
        }
        Ok(grouped.len())
    }

    /// React to a `tabGroups.onUpdated` event
    pub async fn on_group_updated<S: KeyValueStore>(
        &self,
        group: &TabGroupInfo,
        store: &S,
    ) -> Result<(), GroupingError> {
        let Some(title) = group.category() else {
            return Ok(());
        };

        let ours = self.applied_titles.borrow().get(&group.id).map(String::as_str) == Some(title);
        if ours {
            self.record(group.window_id, title, group.id);
            return Ok(());
        }

        let previous = self.manual_groups.borrow().get(&group.id).cloned();
        if previous.as_deref() == Some(title) {
            // Color or collapse change
            return Ok(());
        }

        let mut settings = Settings::load(store).await?;
        let colors_before = settings.colors.len();
        let changed = match &previous {
            None => settings.add_category(title),
            Some(old) => settings.rename_category(old, title),
        };
        if changed {
            log::info!("category list updated from group {}: {:?} -> {:?}", group.id, previous, title);
            storage::save_types(store, &settings.types).await?;
            if settings.colors.len() != colors_before {
                storage::set_as(store, storage::KEY_COLORS, &settings.colors).await?;
            }
        }

        self.applied_titles.borrow_mut().remove(&group.id);
        self.manual_groups
            .borrow_mut()
            .insert(group.id, title.to_string());

        if let Some(old) = previous {
            if self.indexed_group(group.window_id, &old) == Some(group.id) {
                self.forget(group.window_id, &old);
            }
        }
        self.record(group.window_id, title, group.id);
        Ok(())
    }

    /// Tabs currently inside manual groups. Manual groups that turn out to
    /// be empty have been closed and are forgotten.
    pub async fn manual_tab_ids(&self) -> Result<HashSet<TabId>, GroupingError> {
        let group_ids: Vec<GroupId> = self.manual_groups.borrow().keys().copied().collect();

        let mut ids = HashSet::new();
        let mut closed = Vec::new();
        for group_id in group_ids {
            let tabs = self.host.group_tabs_of(group_id).await?;
            if tabs.is_empty() {
                closed.push(group_id);
            }
            ids.extend(tabs.iter().map(|t| t.id));
        }
        self.forget_groups(&closed);
        Ok(ids)
    }

    /// Drop a window's index once its last tab has left
    pub async fn on_tab_detached(&self, old_window_id: WindowId) -> Result<(), GroupingError> {
        let remaining = self.host.window_tabs(old_window_id).await?;
        if remaining.is_empty() {
            log::debug!("window {} is empty, dropping its group index", old_window_id);
            self.window_index.borrow_mut().remove(&old_window_id);
        }
        Ok(())
    }
}
