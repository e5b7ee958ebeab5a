/// Batch and single-tab classification

use futures::future::join_all;

use crate::filter::{FilterRuleItem, is_filtered};
use crate::provider::{Classify, MatchMode, resolve_category};
use crate::tab_data::{CategoryBucket, TabId, TabInfo};

/// Everything a classification run needs besides the tabs
pub struct ClassifyContext<'a, C> {
    pub provider: &'a C,
    pub categories: &'a [String],
    pub filter_rules: &'a [FilterRuleItem],
    pub api_key: &'a str,
    pub match_mode: MatchMode,
}

impl<C: Classify> ClassifyContext<'_, C> {
    /// Tabs that may be sent to the provider at all
    fn eligible(&self, tab: &TabInfo) -> bool {
        match tab.url.as_deref() {
            None | Some("") => false,
            Some(url) => !is_filtered(url, self.filter_rules),
        }
    }

    /// Classify one tab. `None` for filtered tabs, provider failures, and
    /// answers that do not resolve to a category.
    pub async fn classify_tab(&self, tab: &TabInfo) -> Option<String> {
        if !self.eligible(tab) {
            log::debug!("tab {} excluded from classification", tab.id);
            return None;
        }
        let input = tab.classification_input()?;

        match self.provider.classify(&input, self.categories, self.api_key).await {
            Ok(answer) => {
                let category = resolve_category(&answer, self.categories, self.match_mode);
                if category.is_none() {
                    log::info!("tab {}: provider answered {:?}, not a known category", tab.id, answer);
                }
                category
            }
            Err(e) => {
                log::error!("classifying tab {} ({}) failed: {}", tab.id, input.url, e);
                None
            }
        }
    }

    /// Classify all tabs concurrently. Every category appears in the result,
    /// in input order, even when it receives no tabs.
    pub async fn batch_classify(&self, tabs: &[TabInfo]) -> Vec<CategoryBucket> {
        let mut result: Vec<CategoryBucket> = self
            .categories
            .iter()
            .map(|category| CategoryBucket {
                category: category.clone(),
                tab_ids: Vec::new(),
            })
            .collect();

        let answers: Vec<(TabId, Option<String>)> = join_all(
            tabs.iter()
                .map(|tab| async move { (tab.id, self.classify_tab(tab).await) }),
        )
        .await;

        for (tab_id, category) in answers {
            let Some(category) = category else { continue };
            if let Some(bucket) = result.iter_mut().find(|b| b.category == category) {
                bucket.tab_ids.push(tab_id);
            }
        }

        result
    }
}
