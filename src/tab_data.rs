/// Data structures for Tab Grouper
use serde::{Deserialize, Serialize};

pub type TabId = i32;
pub type WindowId = i32;
pub type GroupId = i32;

/// `chrome.tabGroups.TAB_GROUP_ID_NONE`
pub const TAB_GROUP_ID_NONE: GroupId = -1;

/// Information about a browser tab
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabInfo {
    pub id: TabId,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    pub window_id: WindowId,
    #[serde(default)]
    pub status: Option<TabStatus>,
    #[serde(default = "no_group")]
    pub group_id: GroupId,
    #[serde(default)]
    pub index: i32,
    #[serde(default)]
    pub pinned: bool,
}

fn no_group() -> GroupId {
    TAB_GROUP_ID_NONE
}

impl TabInfo {
    pub fn new(id: TabId, url: &str, title: &str, window_id: WindowId) -> TabInfo {
        TabInfo {
            id,
            url: Some(url.to_string()),
            title: Some(title.to_string()),
            window_id,
            status: Some(TabStatus::Complete),
            group_id: TAB_GROUP_ID_NONE,
            index: 0,
            pinned: false,
        }
    }

    pub fn is_grouped(&self) -> bool {
        self.group_id != TAB_GROUP_ID_NONE
    }

    /// The `{url, title}` pair handed to a classification provider
    pub fn classification_input(&self) -> Option<ClassifyInput> {
        let url = self.url.as_deref().filter(|u| !u.is_empty())?;
        Some(ClassifyInput {
            url: url.to_string(),
            title: self.title.clone().unwrap_or_default(),
        })
    }
}

/// The `changeInfo` argument of `tabs.onUpdated`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabChangeInfo {
    #[serde(default)]
    pub status: Option<TabStatus>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// The `detachInfo` argument of `tabs.onDetached`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabDetachInfo {
    pub old_window_id: WindowId,
    #[serde(default)]
    pub old_position: i32,
}

/// What a provider sees of a tab
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifyInput {
    pub url: String,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabStatus {
    Loading,
    Complete,
    Unloaded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowType {
    Normal,
    Popup,
    Panel,
    App,
    Devtools,
}

/// A native tab group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabGroupInfo {
    pub id: GroupId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub color: Option<TabColor>,
    pub window_id: WindowId,
    #[serde(default)]
    pub collapsed: bool,
}

impl TabGroupInfo {
    /// Title if the group has a non-empty one
    pub fn category(&self) -> Option<&str> {
        self.title.as_deref().filter(|t| !t.is_empty())
    }
}

/// The nine colors `chrome.tabGroups` accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabColor {
    Grey,
    Blue,
    Red,
    Yellow,
    Green,
    Pink,
    Purple,
    Cyan,
    Orange,
}

impl TabColor {
    pub const ALL: [TabColor; 9] = [
        TabColor::Grey,
        TabColor::Blue,
        TabColor::Red,
        TabColor::Yellow,
        TabColor::Green,
        TabColor::Pink,
        TabColor::Purple,
        TabColor::Cyan,
        TabColor::Orange,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TabColor::Grey => "grey",
            TabColor::Blue => "blue",
            TabColor::Red => "red",
            TabColor::Yellow => "yellow",
            TabColor::Green => "green",
            TabColor::Pink => "pink",
            TabColor::Purple => "purple",
            TabColor::Cyan => "cyan",
            TabColor::Orange => "orange",
        }
    }

    pub fn from_name(name: &str) -> Option<TabColor> {
        TabColor::ALL.into_iter().find(|c| c.name() == name)
    }

    /// Swatch shown by the options page
    pub fn swatch(self) -> &'static str {
        match self {
            TabColor::Grey => "rgb(218, 220, 224)",
            TabColor::Blue => "rgb(147, 179, 242)",
            TabColor::Red => "rgb(228, 144, 134)",
            TabColor::Yellow => "rgb(247, 215, 117)",
            TabColor::Green => "rgb(145, 199, 153)",
            TabColor::Pink => "rgb(240, 145, 200)",
            TabColor::Purple => "rgb(188, 140, 242)",
            TabColor::Cyan => "rgb(144, 215, 233)",
            TabColor::Orange => "rgb(240, 176, 122)",
        }
    }

    /// Pseudo-random palette pick
    pub fn random() -> TabColor {
        let mut byte = [0u8; 1];
        match getrandom::getrandom(&mut byte) {
            Ok(()) => TabColor::ALL[byte[0] as usize % TabColor::ALL.len()],
            Err(e) => {
                log::warn!("getrandom failed, using grey: {}", e);
                TabColor::Grey
            }
        }
    }
}

/// One category and the tabs classified into it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBucket {
    #[serde(rename = "type")]
    pub category: String,
    pub tab_ids: Vec<TabId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_info_from_chrome_json() {
        let json = r#"{
            "id": 7, "url": "https://github.com/x", "title": "repo",
            "windowId": 3, "status": "complete", "groupId": -1,
            "index": 2, "pinned": false, "active": true, "audible": false
        }"#;

        let tab: TabInfo = serde_json::from_str(json).unwrap();

        assert_eq!(tab.id, 7);
        assert_eq!(tab.window_id, 3);
        assert_eq!(tab.status, Some(TabStatus::Complete));
        assert!(!tab.is_grouped());
        assert_eq!(tab.index, 2);
    }

    #[test]
    fn test_tab_info_missing_optional_fields() {
        let tab: TabInfo = serde_json::from_str(r#"{"id": 1, "windowId": 1}"#).unwrap();

        assert_eq!(tab.url, None);
        assert_eq!(tab.group_id, TAB_GROUP_ID_NONE);
        assert!(tab.classification_input().is_none());
    }

    #[test]
    fn test_classification_input_skips_empty_url() {
        let mut tab = TabInfo::new(1, "", "Empty", 1);
        assert!(tab.classification_input().is_none());

        tab.url = Some("https://example.com".to_string());
        tab.title = None;
        let input = tab.classification_input().unwrap();
        assert_eq!(input.url, "https://example.com");
        assert_eq!(input.title, "");
    }

    #[test]
    fn test_group_category_ignores_empty_title() {
        let group = TabGroupInfo {
            id: 4,
            title: Some(String::new()),
            color: Some(TabColor::Blue),
            window_id: 1,
            collapsed: false,
        };
        assert_eq!(group.category(), None);
    }

    #[test]
    fn test_color_names_round_trip() {
        for color in TabColor::ALL {
            assert_eq!(TabColor::from_name(color.name()), Some(color));
        }
        assert_eq!(TabColor::from_name("magenta"), None);
        assert_eq!(serde_json::to_string(&TabColor::Cyan).unwrap(), "\"cyan\"");
    }

    #[test]
    fn test_random_color_is_in_palette() {
        for _ in 0..20 {
            assert!(TabColor::ALL.contains(&TabColor::random()));
        }
    }
}
