/// The slice of the `chrome.tabs` / `chrome.tabGroups` / `chrome.windows`
/// surface the grouping logic needs

use crate::error::HostError;
use crate::tab_data::{GroupId, TabColor, TabGroupInfo, TabId, TabInfo, WindowId, WindowType};

#[allow(async_fn_in_trait)]
pub trait TabHost {
    async fn get_tab(&self, tab_id: TabId) -> Result<TabInfo, HostError>;

    async fn window_tabs(&self, window_id: WindowId) -> Result<Vec<TabInfo>, HostError>;

    async fn group_tabs_of(&self, group_id: GroupId) -> Result<Vec<TabInfo>, HostError>;

    async fn window_groups(&self, window_id: WindowId) -> Result<Vec<TabGroupInfo>, HostError>;

    async fn window_type(&self, window_id: WindowId) -> Result<WindowType, HostError>;

    /// `chrome.tabs.group`: into `group_id` when given, otherwise a new group
    /// in `window_id`. Returns the id the browser reports, if any.
    async fn group_tabs(
        &self,
        tab_ids: &[TabId],
        group_id: Option<GroupId>,
        window_id: WindowId,
    ) -> Result<Option<GroupId>, HostError>;

    async fn ungroup_tabs(&self, tab_ids: &[TabId]) -> Result<(), HostError>;

    async fn update_group(
        &self,
        group_id: GroupId,
        title: &str,
        color: Option<TabColor>,
    ) -> Result<(), HostError>;

    /// Move a group to `index` in its window; `-1` is the end of the strip
    async fn move_group(&self, group_id: GroupId, index: i32) -> Result<(), HostError>;
}
