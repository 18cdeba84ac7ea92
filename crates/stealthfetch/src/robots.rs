//! robots.txt parsing

use serde::Serialize;
use std::collections::BTreeMap;

/// Rules collected for one user agent
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgentRules {
    pub allow: Vec<String>,
    pub disallow: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crawl_delay: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RobotsPolicy {
    pub user_agents: BTreeMap<String, AgentRules>,
    pub sitemaps: Vec<String>,
}

/// Tool output: the policy plus the robots.txt URL it came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RobotsReport {
    #[serde(flatten)]
    pub policy: RobotsPolicy,
    pub url: String,
}

/// Fold state while scanning lines
#[derive(Default)]
struct Scan {
    policy: RobotsPolicy,
    group: Vec<String>,
}

impl Scan {
    fn each_agent(&mut self, mut apply: impl FnMut(&mut AgentRules)) {
        for agent in &self.group {
            if let Some(rules) = self.policy.user_agents.get_mut(agent) {
                apply(rules);
            }
        }
    }

    fn step(mut self, line: &str) -> Self {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            self.group.clear();
            return self;
        }
        let Some((key, value)) = line.split_once(':') else {
            return self;
        };
        let value = value.trim();

        match key.trim().to_ascii_lowercase().as_str() {
            "user-agent" => {
                self.policy
                    .user_agents
                    .entry(value.to_string())
                    .or_default();
                if !self.group.iter().any(|agent| agent == value) {
                    self.group.push(value.to_string());
                }
            }
            "allow" => {
                self.each_agent(|rules| rules.allow.push(value.to_string()));
            }
            "disallow" => {
                self.each_agent(|rules| rules.disallow.push(value.to_string()));
            }
            "crawl-delay" => {
                if let Ok(delay) = value.parse::<f64>() {
                    if delay.is_finite() {
                        self.each_agent(|rules| rules.crawl_delay = Some(delay));
                    }
                }
            }
            "sitemap" => {
                if !self.policy.sitemaps.iter().any(|s| s == value) {
                    self.policy.sitemaps.push(value.to_string());
                }
            }
            _ => {}
        }
        self
    }
}

/// Parse robots.txt into per-agent rules and sitemap URLs
///
/// Every `User-agent` line joins the current group, and rules apply to all
/// agents in it. Only a blank line starts a new group.
pub fn robots(text: &str) -> RobotsPolicy {
    text.lines().fold(Scan::default(), Scan::step).policy
}
