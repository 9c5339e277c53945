//! Company-name to ticker lookup.
//!
//! Matching is plain substring membership on the lower-cased query, so
//! "apple pie" resolves to AAPL. That is kept as-is.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::Ticker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackedCompany {
    /// Lower-case name searched for in the query
    pub keyword: &'static str,
    pub display_name: &'static str,
    pub ticker: &'static str,
}

const fn company(keyword: &'static str, display_name: &'static str, ticker: &'static str) -> TrackedCompany {
    TrackedCompany {
        keyword,
        display_name,
        ticker,
    }
}

/// Tracked companies in lookup order
pub const TRACKED_COMPANIES: &[TrackedCompany] = &[
    company("apple", "Apple", "AAPL"),
    company("microsoft", "Microsoft", "MSFT"),
    company("amazon", "Amazon", "AMZN"),
    company("google", "Google", "GOOGL"),
    company("tesla", "Tesla", "TSLA"),
    company("nvidia", "Nvidia", "NVDA"),
    company("meta", "Meta", "META"),
    company("netflix", "Netflix", "NFLX"),
    company("tsmc", "TSMC", "TSM"),
    company("samsung", "Samsung", "005930.KQ"),
];

/// Which entry wins when several company names appear in one query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// First table entry that matches
    #[default]
    FirstListed,
    /// Longest matching name, ties go to the earlier table entry
    LongestMatch,
}

impl FromStr for MatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "first" | "first_listed" => Ok(MatchPolicy::FirstListed),
            "longest" | "longest_match" => Ok(MatchPolicy::LongestMatch),
            other => Err(format!("unknown symbol match policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SymbolResolver {
    policy: MatchPolicy,
}

impl SymbolResolver {
    pub fn new(policy: MatchPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Resolve free text to a tracked ticker, `None` when no company name occurs.
    pub fn resolve(&self, text: &str) -> Option<Ticker> {
        if text.trim().is_empty() {
            return None;
        }

        let lowered = text.to_lowercase();
        let mut matches = TRACKED_COMPANIES
            .iter()
            .filter(|c| lowered.contains(c.keyword));

        let hit = match self.policy {
            MatchPolicy::FirstListed => matches.next(),
            // max_by_key returns the last max; walk in reverse so ties keep table order
            MatchPolicy::LongestMatch => matches
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .max_by_key(|c| c.keyword.len()),
        };

        hit.map(|c| Ticker::from(c.ticker))
    }
}

/// Display names of the tracked companies, in table order
pub fn tracked_company_names() -> Vec<&'static str> {
    TRACKED_COMPANIES.iter().map(|c| c.display_name).collect()
}
