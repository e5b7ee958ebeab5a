/// Filter rules: URLs matching any rule are kept out of automatic grouping
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::host_with_port;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleType {
    #[serde(rename = "DOMAIN")]
    Domain,
    #[serde(rename = "DOMAIN-SUFFIX")]
    DomainSuffix,
    #[serde(rename = "DOMAIN-KEYWORD")]
    DomainKeyword,
    #[serde(rename = "REGEX")]
    Regex,
    /// Anything a different build of the options page may have stored
    #[serde(other)]
    Unknown,
}

impl RuleType {
    pub const EDITABLE: [RuleType; 4] = [
        RuleType::Domain,
        RuleType::DomainSuffix,
        RuleType::DomainKeyword,
        RuleType::Regex,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            RuleType::Domain => "Domain",
            RuleType::DomainSuffix => "Domain suffix",
            RuleType::DomainKeyword => "Domain keyword",
            RuleType::Regex => "Regex",
            RuleType::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterRuleItem {
    pub id: f64,
    #[serde(rename = "type")]
    pub rule_type: RuleType,
    #[serde(default)]
    pub rule: String,
}

impl FilterRuleItem {
    pub fn new(id: f64, rule_type: RuleType, rule: &str) -> FilterRuleItem {
        FilterRuleItem {
            id,
            rule_type,
            rule: rule.to_string(),
        }
    }
}

/// Whether a single rule matches a parsed URL
pub fn matches(url: &Url, rule: &FilterRuleItem) -> bool {
    if rule.rule.is_empty() {
        return false;
    }

    let host = host_with_port(url).unwrap_or_default();

    match rule.rule_type {
        RuleType::Domain => host == rule.rule,
        RuleType::DomainSuffix => {
            host == rule.rule || host.ends_with(&format!(".{}", rule.rule))
        }
        RuleType::DomainKeyword => host.contains(&rule.rule),
        RuleType::Regex => match Regex::new(&rule.rule) {
            Ok(re) => re.is_match(url.as_str()),
            Err(e) => {
                log::warn!("ignoring invalid filter regex {:?}: {}", rule.rule, e);
                false
            }
        },
        RuleType::Unknown => false,
    }
}

/// True if any rule matches. Unparseable URLs are never filtered.
pub fn is_filtered(url: &str, rules: &[FilterRuleItem]) -> bool {
    if rules.is_empty() {
        return false;
    }

    match Url::parse(url) {
        Ok(parsed) => rules.iter().any(|rule| matches(&parsed, rule)),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn rule(rule_type: RuleType, value: &str) -> FilterRuleItem {
        FilterRuleItem::new(1.0, rule_type, value)
    }

    #[test]
    fn test_domain_exact() {
        let r = rule(RuleType::Domain, "example.com");
        assert!(matches(&url("https://example.com/a"), &r));
        assert!(!matches(&url("https://www.example.com/a"), &r));
    }

    #[test]
    fn test_domain_suffix() {
        let r = rule(RuleType::DomainSuffix, "example.com");
        assert!(matches(&url("https://www.example.com"), &r));
        assert!(matches(&url("https://example.com"), &r));
        assert!(!matches(&url("https://notexample.com"), &r));
    }

    #[test]
    fn test_domain_keyword() {
        let r = rule(RuleType::DomainKeyword, "github");
        assert!(matches(&url("https://github.com/x"), &r));
        assert!(matches(&url("https://gist.github.io"), &r));
        assert!(!matches(&url("https://gitlab.com/github"), &r));
    }

    #[test]
    fn test_host_includes_non_default_port() {
        let r = rule(RuleType::Domain, "localhost:3000");
        assert!(matches(&url("http://localhost:3000/app"), &r));
        assert!(!matches(&url("http://localhost/app"), &r));
    }

    #[test]
    fn test_regex_matches_full_url() {
        let r = rule(RuleType::Regex, r"/issues/\d+$");
        assert!(matches(&url("https://github.com/rust-lang/rust/issues/42"), &r));
        assert!(!matches(&url("https://github.com/rust-lang/rust/pulls"), &r));
    }

    #[test]
    fn test_invalid_regex_does_not_match() {
        let r = rule(RuleType::Regex, "([unclosed");
        assert!(!matches(&url("https://example.com"), &r));
    }

    #[test]
    fn test_empty_rule_and_unknown_type() {
        assert!(!matches(&url("https://example.com"), &rule(RuleType::DomainKeyword, "")));
        assert!(!matches(&url("https://example.com"), &rule(RuleType::Unknown, "example.com")));
    }

    #[test]
    fn test_is_filtered_or_semantics() {
        let rules = vec![
            rule(RuleType::Domain, "news.ycombinator.com"),
            rule(RuleType::DomainKeyword, "github"),
        ];
        assert!(is_filtered("https://github.com/x", &rules));
        assert!(is_filtered("https://news.ycombinator.com/item?id=1", &rules));
        assert!(!is_filtered("https://example.com", &rules));
        assert!(!is_filtered("https://github.com/x", &[]));
        assert!(!is_filtered("not a url", &rules));
    }

    #[test]
    fn test_deserialize_stored_rules() {
        let json = r#"[
            {"id": 1700000000000, "type": "DOMAIN-SUFFIX", "rule": "example.com"},
            {"id": 2, "type": "IP-CIDR", "rule": "10.0.0.0/8"}
        ]"#;

        let rules: Vec<FilterRuleItem> = serde_json::from_str(json).unwrap();

        assert_eq!(rules[0].rule_type, RuleType::DomainSuffix);
        assert_eq!(rules[1].rule_type, RuleType::Unknown);
    }
}
