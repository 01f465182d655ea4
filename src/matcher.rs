use crate::api::CatalogClient;
use crate::error::{Error, Result};
use crate::models::{CatalogSong, MatchOutcome, SongDescriptor};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Aggregated result of one `BatchMatcher::match_songs` run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchReport {
    /// Target-catalog songs to add, in source order.
    pub matched: Vec<CatalogSong>,
    /// Source songs with no acceptable target-catalog counterpart.
    pub unavailable: Vec<SongDescriptor>,
    pub outcomes: Vec<MatchOutcome>,
}

impl MatchReport {
    fn from_outcomes(outcomes: Vec<MatchOutcome>) -> Self {
        let mut matched = Vec::new();
        let mut unavailable = Vec::new();
        for outcome in &outcomes {
            match outcome {
                MatchOutcome::Unavailable(d) => unavailable.push(d.clone()),
                other => matched.extend(other.song().cloned()),
            }
        }
        Self { matched, unavailable, outcomes }
    }

    pub fn replaced_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, MatchOutcome::Replaced { .. }))
            .count()
    }
}

/// ISRC bookkeeping shared by every batch of one run.
#[derive(Debug, Default)]
struct MatchState {
    /// Target ISRCs already placed in the result.
    accepted: HashSet<String>,
    /// Source ISRCs satisfied through an equivalent track.
    replaced: HashSet<String>,
}

impl MatchState {
    fn is_resolved(&self, key: &str) -> bool {
        self.accepted.contains(key) || self.replaced.contains(key)
    }
}

/// Matches songs from one catalog into another.
///
/// Per batch: one ISRC lookup, then an equivalent-track lookup for each
/// unplayable hit, then a free-text search for whatever is still unresolved.
/// Batches run strictly in order so the ISRC dedup state of batch N is
/// visible to batch N+1.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchMatcher {
    batch_size: Option<usize>,
}

impl BatchMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a smaller batch than the target's ISRC endpoint allows.
    pub fn with_batch_size(batch_size: usize) -> Self {
        Self { batch_size: Some(batch_size) }
    }

    fn effective_batch_size(&self, target: &dyn CatalogClient) -> usize {
        let hard = target.limits().isrc_batch.max(1);
        self.batch_size.map(|b| b.clamp(1, hard)).unwrap_or(hard)
    }

    pub async fn match_songs(
        &self,
        source: &[CatalogSong],
        target: &dyn CatalogClient,
    ) -> Result<MatchReport> {
        let batch_size = self.effective_batch_size(target);
        let mut state = MatchState::default();
        let mut outcomes = Vec::with_capacity(source.len());

        for (n, batch) in source.chunks(batch_size).enumerate() {
            debug!("Matching batch {} ({} songs) into {}", n + 1, batch.len(), target.catalog());
            self.match_batch(batch, target, &mut state, &mut outcomes).await?;
        }

        let report = MatchReport::from_outcomes(outcomes);
        info!(
            "Matched {}/{} songs into {} ({} via equivalents, {} unavailable)",
            report.matched.len(),
            source.len(),
            target.catalog(),
            report.replaced_count(),
            report.unavailable.len()
        );
        Ok(report)
    }

    async fn match_batch(
        &self,
        batch: &[CatalogSong],
        target: &dyn CatalogClient,
        state: &mut MatchState,
        outcomes: &mut Vec<MatchOutcome>,
    ) -> Result<()> {
        let mut requested: Vec<String> = Vec::new();
        for key in batch.iter().filter_map(CatalogSong::isrc_key) {
            if !state.is_resolved(&key) && !requested.contains(&key) {
                requested.push(key);
            }
        }

        // Outcomes found through the ISRC lookup, keyed by source ISRC.
        let mut found: HashMap<String, MatchOutcome> = HashMap::new();
        if !requested.is_empty() {
            let rows = target
                .fetch_tracks_by_isrc(&requested)
                .await
                .map_err(|e| Error::remote("fetch_tracks_by_isrc", e))?;

            for row in rows {
                let Some(key) = row.isrc_key() else { continue };
                if !requested.contains(&key) || state.is_resolved(&key) {
                    continue;
                }
                if row.playable {
                    state.accepted.insert(key.clone());
                    found.insert(key, MatchOutcome::Matched(row));
                    continue;
                }
                if let Some(replacement) = self.playable_equivalent(&row, target, state).await {
                    debug!(
                        "{} ({}) unplayable, using equivalent {}",
                        row.name, key, replacement.native_id
                    );
                    if let Some(rk) = replacement.isrc_key() {
                        state.accepted.insert(rk);
                    }
                    state.replaced.insert(key.clone());
                    found.insert(
                        key.clone(),
                        MatchOutcome::Replaced { original_isrc: key, replacement },
                    );
                }
            }
        }

        for song in batch {
            match song.isrc_key() {
                Some(key) if found.contains_key(&key) => {
                    outcomes.extend(found.remove(&key));
                }
                Some(key) if state.is_resolved(&key) => {
                    debug!("{} shares ISRC {} with an earlier match; skipping", song.name, key);
                }
                _ => {
                    if let Some(outcome) = self.search_fallback(song, target, state).await {
                        outcomes.push(outcome);
                    }
                }
            }
        }
        Ok(())
    }

    /// First playable, non-duplicate equivalent of an unplayable track.
    /// Lookup failures are downgraded to "no equivalent".
    async fn playable_equivalent(
        &self,
        row: &CatalogSong,
        target: &dyn CatalogClient,
        state: &MatchState,
    ) -> Option<CatalogSong> {
        let equivalents = match target.fetch_equivalent_tracks(&row.native_id).await {
            Ok(e) => e,
            Err(e) => {
                warn!("Equivalent lookup for {} failed: {:#}", row.native_id, e);
                return None;
            }
        };
        equivalents.into_iter().find(|eq| {
            eq.playable && eq.isrc_key().map_or(true, |k| !state.accepted.contains(&k))
        })
    }

    /// Search `"<name> <artist>"` and accept the first playable hit whose name
    /// equals the source name exactly. Returns `None` when that hit is a
    /// recording already present in the result.
    async fn search_fallback(
        &self,
        song: &CatalogSong,
        target: &dyn CatalogClient,
        state: &mut MatchState,
    ) -> Option<MatchOutcome> {
        let query = format!("{} {}", song.name, song.artist);
        let results = match target.search(&query).await {
            Ok(r) => r,
            Err(e) => {
                warn!("Search for {:?} failed: {:#}", query, e);
                return Some(MatchOutcome::Unavailable(song.descriptor()));
            }
        };

        let Some(hit) = results.into_iter().find(|c| c.playable && c.name == song.name) else {
            debug!("No search match for {}", song.descriptor());
            return Some(MatchOutcome::Unavailable(song.descriptor()));
        };

        match hit.isrc_key() {
            Some(k) if state.accepted.contains(&k) => {
                debug!("Search hit for {} duplicates ISRC {}; skipping", song.name, k);
                None
            }
            key => {
                state.accepted.extend(key);
                Some(MatchOutcome::Matched(hit))
            }
        }
    }
}
