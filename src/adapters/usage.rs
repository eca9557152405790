//! Usage tally: counts completed cocktails.
//!
//! Implements [`UsageSink`]: the service calls it once per serving that
//! reached `Completed`.  The tally is kept in memory and written back as
//! one postcard blob through any [`StoragePort`] after every change.  A
//! blob that cannot be read starts the tally empty.

use std::collections::BTreeMap;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{StoragePort, TimePort, UsageSink};

const STATS_NAMESPACE: &str = "stats";
const STATS_KEY: &str = "tally";
const MAX_TALLY_BYTES: usize = 4000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CocktailStat {
    pub id: String,
    pub name: String,
    pub count: u32,
    /// Epoch seconds of the most recent completion.
    pub last_made: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageTotals {
    pub total: u32,
    pub unique: usize,
    pub most_popular: Option<CocktailStat>,
}

pub struct UsageTally<S: StoragePort, C: TimePort> {
    stats: BTreeMap<String, CocktailStat>,
    storage: S,
    clock: C,
}

impl<S: StoragePort, C: TimePort> UsageTally<S, C> {
    pub fn load(storage: S, clock: C) -> Self {
        let mut buf = vec![0u8; MAX_TALLY_BYTES];
        let stats = match storage.read(STATS_NAMESPACE, STATS_KEY, &mut buf) {
            Ok(len) => postcard::from_bytes(&buf[..len]).unwrap_or_else(|_| {
                warn!("Usage: stored tally corrupted, starting empty");
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        Self {
            stats,
            storage,
            clock,
        }
    }

    /// Every entry, most made first.
    pub fn stats(&self) -> Vec<CocktailStat> {
        let mut all: Vec<CocktailStat> = self.stats.values().cloned().collect();
        all.sort_by(|a, b| b.count.cmp(&a.count));
        all
    }

    pub fn get(&self, cocktail_id: &str) -> Option<&CocktailStat> {
        self.stats.get(cocktail_id)
    }

    pub fn totals(&self) -> UsageTotals {
        let most_popular = self
            .stats
            .values()
            .fold(None::<&CocktailStat>, |best, s| match best {
                Some(b) if b.count >= s.count => Some(b),
                _ => Some(s),
            })
            .cloned();
        UsageTotals {
            total: self
                .stats
                .values()
                .fold(0u32, |acc, s| acc.saturating_add(s.count)),
            unique: self.stats.len(),
            most_popular,
        }
    }

    /// Forget one cocktail.  Returns `false` if it was never made.
    pub fn reset(&mut self, cocktail_id: &str) -> bool {
        if self.stats.remove(cocktail_id).is_none() {
            return false;
        }
        self.persist();
        true
    }

    pub fn reset_all(&mut self) {
        self.stats.clear();
        self.persist();
    }

    fn persist(&mut self) {
        let bytes = match postcard::to_allocvec(&self.stats) {
            Ok(b) => b,
            Err(e) => {
                warn!("Usage: encoding tally failed ({})", e);
                return;
            }
        };
        if let Err(e) = self.storage.write(STATS_NAMESPACE, STATS_KEY, &bytes) {
            warn!("Usage: saving tally failed ({})", e);
        }
    }
}

impl<S: StoragePort, C: TimePort> UsageSink for UsageTally<S, C> {
    fn record(&mut self, cocktail_id: &str, cocktail_name: &str) {
        let now = self.clock.now_epoch_secs();
        let entry = self
            .stats
            .entry(cocktail_id.to_string())
            .or_insert_with(|| CocktailStat {
                id: cocktail_id.to_string(),
                name: cocktail_name.to_string(),
                count: 0,
                last_made: now,
            });
        entry.count = entry.count.saturating_add(1);
        entry.last_made = now;
        entry.name = cocktail_name.to_string();
        info!("Usage: '{}' made {} time(s)", cocktail_name, entry.count);
        self.persist();
    }
}
