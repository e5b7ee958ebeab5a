/// Background event handling
///
/// `GroupingService` is built once when the background page starts and owns
/// every piece of mutable state: the reconciler's per-window indexes, the
/// manual group registry and the tab snapshot cache used to spot same-site
/// navigations. Settings are re-read from storage on every event.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::classifier::ClassifyContext;
use crate::domain::root_domain;
use crate::error::{Error, Result};
use crate::host::TabHost;
use crate::provider::{MatchMode, ProviderFactory};
use crate::reconciler::{AssignOptions, GroupReconciler};
use crate::storage::{self, KeyValueStore, Settings};
use crate::tab_data::{
    CategoryBucket, GroupId, TabChangeInfo, TabDetachInfo, TabGroupInfo, TabId, TabInfo,
    TabStatus, WindowId, WindowType,
};

pub struct GroupingService<H, S, P> {
    reconciler: GroupReconciler<H>,
    store: S,
    providers: P,
    match_mode: MatchMode,
    tab_cache: RefCell<HashMap<TabId, TabInfo>>,
}

impl<H, S, P> GroupingService<H, S, P>
where
    H: TabHost,
    S: KeyValueStore,
    P: ProviderFactory,
{
    pub fn new(host: H, store: S, providers: P) -> Self {
        GroupingService {
            reconciler: GroupReconciler::new(host),
            store,
            providers,
            match_mode: MatchMode::default(),
            tab_cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn with_match_mode(mut self, match_mode: MatchMode) -> Self {
        self.match_mode = match_mode;
        self
    }

    pub fn reconciler(&self) -> &GroupReconciler<H> {
        &self.reconciler
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cached_tab(&self, tab_id: TabId) -> Option<TabInfo> {
        self.tab_cache.borrow().get(&tab_id).cloned()
    }

    /// `runtime.onInstalled`
    pub async fn on_installed(&self) -> Result<()> {
        storage::seed_defaults(&self.store).await?;
        Ok(())
    }

    /// Preconditions shared by the created and updated handlers
    async fn should_group(&self, tab: &TabInfo, settings: &Settings) -> bool {
        if !settings.is_on || settings.types.is_empty() || tab.classification_input().is_none() {
            return false;
        }
        match self.reconciler.host().window_type(tab.window_id).await {
            Ok(WindowType::Normal) => true,
            Ok(_) => false,
            Err(e) => {
                log::debug!("window {} not available: {}", tab.window_id, e);
                false
            }
        }
    }

    async fn classify_and_assign(&self, tab: &TabInfo, settings: &Settings) -> Result<Option<GroupId>> {
        let provider = self.providers.build(settings);
        let ctx = ClassifyContext {
            provider: &provider,
            categories: &settings.types,
            filter_rules: &settings.filter_rules,
            api_key: &settings.api_key,
            match_mode: self.match_mode,
        };

        let Some(category) = ctx.classify_tab(tab).await else {
            return Ok(None);
        };

        let options = AssignOptions::for_category(settings, &category);
        let group_id = self
            .reconciler
            .assign_tab_to_group(tab, &category, options)
            .await?;
        Ok(Some(group_id))
    }

    /// `tabs.onCreated`
    pub async fn on_tab_created(&self, tab: &TabInfo) -> Result<Option<GroupId>> {
        self.tab_cache.borrow_mut().insert(tab.id, tab.clone());

        let settings = Settings::load(&self.store).await?;
        if !self.should_group(tab, &settings).await {
            return Ok(None);
        }
        self.classify_and_assign(tab, &settings).await
    }

    /// `tabs.onUpdated`; only a transition to `complete` is acted on
    pub async fn on_tab_updated(&self, change: &TabChangeInfo, tab: &TabInfo) -> Result<Option<GroupId>> {
        if change.status != Some(TabStatus::Complete) {
            return Ok(None);
        }
        let previous = self.tab_cache.borrow_mut().insert(tab.id, tab.clone());

        let settings = Settings::load(&self.store).await?;
        if !self.should_group(tab, &settings).await {
            return Ok(None);
        }

        if self.reconciler.manual_tab_ids().await?.contains(&tab.id) {
            log::debug!("tab {} is in a manual group, leaving it alone", tab.id);
            return Ok(None);
        }

        if let Some(previous) = previous {
            let before = previous.url.as_deref().and_then(root_domain);
            let after = tab.url.as_deref().and_then(root_domain);
            if before.is_some() && before == after {
                log::debug!("tab {} stayed on {:?}, not reclassifying", tab.id, after);
                return Ok(None);
            }
        }

        self.classify_and_assign(tab, &settings).await
    }

    /// `tabs.onDetached`
    pub async fn on_tab_detached(&self, tab_id: TabId, detach: &TabDetachInfo) -> Result<()> {
        log::debug!("tab {} detached from window {}", tab_id, detach.old_window_id);
        self.reconciler.on_tab_detached(detach.old_window_id).await?;
        Ok(())
    }

    /// `tabs.onRemoved`
    pub fn on_tab_removed(&self, tab_id: TabId) {
        self.tab_cache.borrow_mut().remove(&tab_id);
    }

    /// `tabGroups.onUpdated`
    pub async fn on_tab_group_updated(&self, group: &TabGroupInfo) -> Result<()> {
        self.reconciler.on_group_updated(group, &self.store).await?;
        Ok(())
    }

    /// Classify every tab of a window in one batch and group the results
    pub async fn group_window(&self, window_id: WindowId) -> Result<Vec<CategoryBucket>> {
        let settings = Settings::load(&self.store).await?;
        let tabs = self.reconciler.host().window_tabs(window_id).await?;

        let provider = self.providers.build(&settings);
        let ctx = ClassifyContext {
            provider: &provider,
            categories: &settings.types,
            filter_rules: &settings.filter_rules,
            api_key: &settings.api_key,
            match_mode: self.match_mode,
        };
        let buckets = ctx.batch_classify(&tabs).await;

        let mut first_error: Option<Error> = None;
        for bucket in buckets.iter().filter(|b| !b.tab_ids.is_empty()) {
            let options = AssignOptions::for_category(&settings, &bucket.category);
            if let Err(e) = self
                .reconciler
                .assign_many_tabs_to_type(&bucket.category, &bucket.tab_ids, options)
                .await
            {
                first_error.get_or_insert(e.into());
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(buckets),
        }
    }

    pub async fn ungroup_window(&self, window_id: WindowId) -> Result<usize> {
        Ok(self.reconciler.ungroup_all(window_id).await?)
    }
}
