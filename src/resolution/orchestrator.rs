// src/resolution/orchestrator.rs - Per (property, platform) resolution state machine
use anyhow::{anyhow, Result};
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use crate::matching::{analyze_match_in_city, generate_queries, validate_city};
use crate::models::{
    MatchCandidate, MatchRule, MatchVerdict, Property, ResolutionRecord, ResolutionStatus,
    ScoredCandidate, RATE_LIMITED_MARKER,
};
use crate::sources::{classify_error, FailureKind, SourceAdapter, SourceError};
use crate::utils::cancel::CancelToken;
use crate::utils::constants::{
    EXACT_MATCH_CONFIDENCE, NON_MATCH_CONFIDENCE, WORD_OVERLAP_CONFIDENCE,
};
use crate::utils::progress_bars::logging::ResolutionLogger;
use crate::utils::resolver_config::ResolverConfig;

/// Fixed confidence label for a verdict.
pub fn confidence_for(verdict: &MatchVerdict) -> f64 {
    if !verdict.is_match {
        return NON_MATCH_CONFIDENCE;
    }
    match verdict.rule {
        MatchRule::ExactMatch | MatchRule::Containment => EXACT_MATCH_CONFIDENCE,
        MatchRule::WordOverlap => WORD_OVERLAP_CONFIDENCE,
        _ => NON_MATCH_CONFIDENCE,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Progress of one unit between adapter calls.
#[derive(Default)]
struct UnitProgress {
    attempts: u32,
    queries_tried: Vec<String>,
    first_scored: Option<Vec<ScoredCandidate>>,
    last_error: Option<(FailureKind, String)>,
}

/// What a unit does after inspecting one adapter response.
enum Step {
    Continue,
    Finish(ResolutionRecord),
}

/// Resolves one property on one platform into exactly one terminal record.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    config: ResolverConfig,
}

impl Resolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Scores one candidate against the property: name verdict, city guard, fixed confidence.
    pub fn score(&self, property: &Property, candidate: MatchCandidate) -> ScoredCandidate {
        let verdict =
            analyze_match_in_city(&property.name, &candidate.display_name, Some(&property.city));
        let city_ok = validate_city(candidate.formatted_address.as_deref(), &property.city);
        let confidence = confidence_for(&verdict);
        ScoredCandidate {
            candidate,
            verdict,
            confidence,
            city_ok,
        }
    }

    fn is_accepted(&self, scored: &ScoredCandidate) -> bool {
        scored.is_confirmed()
            && scored.confidence >= self.config.match_threshold
            && scored.candidate.is_addressable()
    }

    /// Runs one adapter call under the per-call timeout, turning panics into errors.
    async fn guarded<T, F>(&self, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.config.call_timeout, AssertUnwindSafe(call).catch_unwind())
            .await
        {
            Err(_) => Err(SourceError::Timeout(format!(
                "adapter call exceeded {}s",
                self.config.call_timeout.as_secs()
            ))
            .into()),
            Ok(Err(payload)) => Err(anyhow!("adapter panicked: {}", panic_message(&*payload))),
            Ok(Ok(result)) => result,
        }
    }

    /// Like `resolve_with_cancel` without a cancellation source.
    pub async fn resolve(&self, property: &Property, adapter: &dyn SourceAdapter) -> ResolutionRecord {
        let platform = adapter.platform();
        self.resolve_with_cancel(property, adapter, &CancelToken::new())
            .await
            .unwrap_or_else(|| {
                ResolutionRecord::failed(
                    &property.id,
                    platform,
                    ResolutionStatus::ScrapeFailed,
                    "resolution cancelled".to_string(),
                )
            })
    }

    /// Resolves `property` on the adapter's platform.
    ///
    /// Returns `None` only when `cancel` fires; a cancelled unit produces no record.
    /// Otherwise the record is in exactly one terminal state and carries the attempt
    /// count, the queries sent and the elapsed time.
    pub async fn resolve_with_cancel(
        &self,
        property: &Property,
        adapter: &dyn SourceAdapter,
        cancel: &CancelToken,
    ) -> Option<ResolutionRecord> {
        let platform = adapter.platform();
        let logger = ResolutionLogger::new(platform, &property.id);
        let started = Instant::now();

        let queries: Vec<String> =
            generate_queries(&property.name, &property.city, property.state.as_deref())
                .into_iter()
                .take(self.config.max_queries)
                .collect();
        logger.log_start(&property.name, &property.city, queries.len());

        let mut progress = UnitProgress::default();

        if cancel.is_cancelled() {
            logger.log_cancelled();
            return None;
        }

        if let Some(identifier) = property.known_identifier(platform) {
            if adapter.supports_lookup() {
                logger.log_known_identifier(identifier);
                progress.attempts += 1;
                let outcome = self.guarded(adapter.fetch_by_id(identifier)).await;
                if cancel.is_cancelled() {
                    logger.log_cancelled();
                    return None;
                }
                match outcome {
                    Ok(Some(candidate)) => {
                        let scored = self.score(property, candidate);
                        logger.log_verdict(&scored);
                        if self.is_accepted(&scored) {
                            let record = ResolutionRecord::resolved(&property.id, platform, &scored);
                            return Some(self.finish(record, progress, started, &logger));
                        }
                    }
                    Ok(None) => {}
                    Err(err) => {
                        if let Step::Finish(record) =
                            self.on_error(property, platform, err, "<known identifier>", &mut progress, &logger)
                        {
                            return Some(self.finish(record, progress, started, &logger));
                        }
                    }
                }
            }
        }

        if queries.is_empty() {
            let record = ResolutionRecord::failed(
                &property.id,
                platform,
                ResolutionStatus::ScrapeFailed,
                format!("no search query could be built from name '{}'", property.name),
            );
            return Some(self.finish(record, progress, started, &logger));
        }

        for (index, query) in queries.iter().enumerate() {
            if cancel.is_cancelled() {
                logger.log_cancelled();
                return None;
            }
            logger.log_query_attempt(index + 1, queries.len(), query);
            progress.attempts += 1;
            progress.queries_tried.push(query.clone());

            let outcome = self.guarded(adapter.search(query)).await;
            if cancel.is_cancelled() {
                logger.log_cancelled();
                return None;
            }

            let step = match outcome {
                Err(err) => self.on_error(property, platform, err, query, &mut progress, &logger),
                Ok(found) => self.on_candidates(property, platform, query, found, &mut progress, &logger),
            };
            if let Step::Finish(record) = step {
                return Some(self.finish(record, progress, started, &logger));
            }
        }

        let record = self.conclude(property, platform, &mut progress);
        Some(self.finish(record, progress, started, &logger))
    }

    fn on_error(
        &self,
        property: &Property,
        platform: crate::models::Platform,
        err: anyhow::Error,
        query: &str,
        progress: &mut UnitProgress,
        logger: &ResolutionLogger,
    ) -> Step {
        let message = format!("{:#}", err);
        logger.log_query_error(query, &message);
        match classify_error(&err) {
            FailureKind::RateLimited => Step::Finish(ResolutionRecord::failed(
                &property.id,
                platform,
                ResolutionStatus::ScrapeFailed,
                format!("{}: {}", RATE_LIMITED_MARKER, message),
            )),
            kind => {
                progress.last_error = Some((kind, message));
                Step::Continue
            }
        }
    }

    fn on_candidates(
        &self,
        property: &Property,
        platform: crate::models::Platform,
        query: &str,
        found: Vec<MatchCandidate>,
        progress: &mut UnitProgress,
        logger: &ResolutionLogger,
    ) -> Step {
        logger.log_candidates(query, &found);
        if found.is_empty() {
            return Step::Continue;
        }

        let mut scored_list = Vec::with_capacity(self.config.max_candidates.min(found.len()));
        for candidate in found.into_iter().take(self.config.max_candidates) {
            let scored = self.score(property, candidate);
            logger.log_verdict(&scored);
            if self.is_accepted(&scored) {
                return Step::Finish(ResolutionRecord::resolved(&property.id, platform, &scored));
            }
            if scored.verdict.is_match && !scored.city_ok {
                logger.log_city_rejection(&scored, &property.city);
            }
            scored_list.push(scored);
        }

        if progress.first_scored.is_none() {
            progress.first_scored = Some(scored_list);
        }
        Step::Continue
    }

    /// Terminal state once every query has been tried without a confirmed match.
    fn conclude(
        &self,
        property: &Property,
        platform: crate::models::Platform,
        progress: &mut UnitProgress,
    ) -> ResolutionRecord {
        if let Some(scored) = progress.first_scored.take() {
            return ResolutionRecord::needs_review(&property.id, platform, scored);
        }
        match progress.last_error.take() {
            Some((FailureKind::Timeout, message)) => ResolutionRecord::failed(
                &property.id,
                platform,
                ResolutionStatus::Timeout,
                message,
            ),
            Some((_, message)) => ResolutionRecord::failed(
                &property.id,
                platform,
                ResolutionStatus::ScrapeFailed,
                message,
            ),
            None => ResolutionRecord::new(&property.id, platform, ResolutionStatus::NotListed),
        }
    }

    fn finish(
        &self,
        mut record: ResolutionRecord,
        progress: UnitProgress,
        started: Instant,
        logger: &ResolutionLogger,
    ) -> ResolutionRecord {
        record.attempts = progress.attempts;
        record.queries_tried = progress.queries_tried;
        record.duration_ms = started.elapsed().as_millis() as u64;
        logger.log_outcome(&record);
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Platform;
    use crate::resolution::test_support::{candidates, ScriptedAdapter, Step as Script};
    use std::time::Duration;

    fn westin() -> Property {
        Property::new("p-westin", "The Westin Sacramento", "Sacramento", Some("CA"))
    }

    fn fast_resolver() -> Resolver {
        Resolver::new(ResolverConfig {
            call_timeout: Duration::from_millis(200),
            ..ResolverConfig::default()
        })
    }

    #[tokio::test]
    async fn test_westin_resolves_on_first_query() {
        let adapter = ScriptedAdapter::new(
            Platform::Booking,
            vec![candidates(&[(
                "Westin Sacramento Riverfront",
                "500 J St, Sacramento, CA",
                "bk-1",
            )])],
        );
        let record = fast_resolver().resolve(&westin(), &adapter).await;

        assert_eq!(record.status, ResolutionStatus::Resolved);
        assert_eq!(record.confidence, Some(0.9));
        assert_eq!(record.identifier.as_deref(), Some("bk-1"));
        assert!(record
            .match_reason
            .as_deref()
            .unwrap()
            .contains("Brand-family-compatible containment"));
        assert_eq!(adapter.queries(), vec!["westin sacramento hotel Sacramento CA"]);
        assert_eq!(record.queries_tried, adapter.queries());
        assert_eq!(record.attempts, 1);
        record.check_invariants(0.8).unwrap();
    }

    #[tokio::test]
    async fn test_city_guard_blocks_resolution() {
        let property = Property::new("p1", "Hotel Granduca", "Denver", Some("CO"));
        let adapter = ScriptedAdapter::new(
            Platform::Expedia,
            vec![candidates(&[("Hotel Granduca", "123 Main St, Austin, TX", "ex-1")])],
        );
        let record = fast_resolver().resolve(&property, &adapter).await;

        assert_eq!(record.status, ResolutionStatus::NeedsReview);
        assert_eq!(record.candidates.len(), 1);
        assert!(record.candidates[0].verdict.is_match);
        assert!(!record.candidates[0].city_ok);
        record.check_invariants(0.8).unwrap();
    }

    #[tokio::test]
    async fn test_city_rejection_keeps_scanning() {
        let property = Property::new("p1", "Hotel Granduca", "Denver", Some("CO"));
        let adapter = ScriptedAdapter::new(
            Platform::Expedia,
            vec![candidates(&[
                ("Hotel Granduca", "123 Main St, Austin, TX", "ex-1"),
                ("Hotel Granduca Denver", "1 Larimer St, Denver, CO", "ex-2"),
            ])],
        );
        let record = fast_resolver().resolve(&property, &adapter).await;
        assert_eq!(record.status, ResolutionStatus::Resolved);
        assert_eq!(record.identifier.as_deref(), Some("ex-2"));
    }

    #[tokio::test]
    async fn test_no_auto_accept_of_unmatched_candidates() {
        let adapter = ScriptedAdapter::new(
            Platform::TripAdvisor,
            vec![
                candidates(&[("Citizen Hotel", "926 J St, Sacramento, CA", "ta-1")]),
                candidates(&[("Kimpton Sawyer Hotel", "500 J St, Sacramento, CA", "ta-2")]),
            ],
        );
        let record = fast_resolver().resolve(&westin(), &adapter).await;

        assert_eq!(record.status, ResolutionStatus::NeedsReview);
        assert_eq!(record.identifier, None);
        assert_eq!(record.candidates.len(), 1);
        assert_eq!(record.candidates[0].candidate.display_name, "Citizen Hotel");
        assert_eq!(record.candidates[0].confidence, 0.3);
        assert_eq!(record.attempts, 3);
    }

    #[tokio::test]
    async fn test_not_listed_when_every_query_is_empty() {
        let adapter = ScriptedAdapter::new(Platform::Booking, Vec::new());
        let record = fast_resolver().resolve(&westin(), &adapter).await;
        assert_eq!(record.status, ResolutionStatus::NotListed);
        assert_eq!(record.attempts, 3);
        assert_eq!(record.queries_tried.len(), 3);
    }

    #[tokio::test]
    async fn test_rate_limit_ends_unit_immediately() {
        let adapter = ScriptedAdapter::new(
            Platform::GooglePlaces,
            vec![Script::Fail(SourceError::RateLimited("429 RESOURCE_EXHAUSTED".into()))],
        );
        let record = fast_resolver().resolve(&westin(), &adapter).await;
        assert_eq!(record.status, ResolutionStatus::ScrapeFailed);
        assert!(record.was_rate_limited());
        assert_eq!(record.attempts, 1);
        assert_eq!(adapter.queries().len(), 1);
    }

    #[tokio::test]
    async fn test_timeouts_exhaust_into_timeout_status() {
        let adapter = ScriptedAdapter::new(
            Platform::Booking,
            vec![Script::Hang, Script::Error("upstream timed out".into()), Script::Hang],
        );
        let record = fast_resolver().resolve(&westin(), &adapter).await;
        assert_eq!(record.status, ResolutionStatus::Timeout);
        assert_eq!(record.attempts, 3);
        assert!(record.last_error.is_some());
    }

    #[tokio::test]
    async fn test_failing_variant_advances_to_next() {
        let adapter = ScriptedAdapter::new(
            Platform::Booking,
            vec![
                Script::Error("connection reset".into()),
                candidates(&[("Westin Sacramento", "4800 Riverbend Ave, Sacramento, CA", "bk-9")]),
            ],
        );
        let record = fast_resolver().resolve(&westin(), &adapter).await;
        assert_eq!(record.status, ResolutionStatus::Resolved);
        assert_eq!(record.attempts, 2);
    }

    #[tokio::test]
    async fn test_unavailable_errors_become_scrape_failed() {
        let adapter = ScriptedAdapter::new(
            Platform::Booking,
            vec![
                Script::Error("connection reset".into()),
                Script::Panic,
                Script::Candidates(Vec::new()),
            ],
        );
        let record = fast_resolver().resolve(&westin(), &adapter).await;
        assert_eq!(record.status, ResolutionStatus::ScrapeFailed);
        assert!(record.last_error.as_deref().unwrap().contains("panicked"));
        assert!(!record.was_rate_limited());
    }

    #[tokio::test]
    async fn test_candidates_beat_errors() {
        let adapter = ScriptedAdapter::new(
            Platform::Booking,
            vec![
                candidates(&[("Citizen Hotel", "926 J St, Sacramento, CA", "bk-1")]),
                Script::Error("gateway timeout".into()),
            ],
        );
        let record = fast_resolver().resolve(&westin(), &adapter).await;
        assert_eq!(record.status, ResolutionStatus::NeedsReview);
    }

    #[tokio::test]
    async fn test_candidate_cap() {
        let many: Vec<(String, String, String)> = (0..8)
            .map(|i| (format!("Unrelated Place {}", i), "Sacramento, CA".to_string(), format!("id{}", i)))
            .collect();
        let refs: Vec<(&str, &str, &str)> = many
            .iter()
            .map(|(a, b, c)| (a.as_str(), b.as_str(), c.as_str()))
            .collect();
        let adapter = ScriptedAdapter::new(Platform::Booking, vec![candidates(&refs)]);
        let record = fast_resolver().resolve(&westin(), &adapter).await;
        assert_eq!(record.status, ResolutionStatus::NeedsReview);
        assert_eq!(record.candidates.len(), 5);
    }

    #[tokio::test]
    async fn test_known_identifier_fast_path() {
        let property = westin().with_known_identifier(Platform::GooglePlaces, "ChIJ123");
        let adapter = ScriptedAdapter::new(Platform::GooglePlaces, Vec::new()).with_lookup(
            MatchCandidate::new("The Westin Sacramento")
                .with_address("4800 Riverbend Ave, Sacramento, CA 95821")
                .with_identifier("ChIJ123"),
        );
        let record = fast_resolver().resolve(&property, &adapter).await;
        assert_eq!(record.status, ResolutionStatus::Resolved);
        assert_eq!(adapter.lookups(), 1);
        assert!(adapter.queries().is_empty());
        assert!(record.queries_tried.is_empty());
        assert_eq!(record.attempts, 1);
    }

    #[tokio::test]
    async fn test_unverified_lookup_falls_back_to_search() {
        let property = westin().with_known_identifier(Platform::GooglePlaces, "ChIJstale");
        let adapter = ScriptedAdapter::new(Platform::GooglePlaces, Vec::new())
            .with_lookup(MatchCandidate::new("Some Other Hotel").with_identifier("ChIJstale"));
        let record = fast_resolver().resolve(&property, &adapter).await;
        assert_eq!(record.status, ResolutionStatus::NotListed);
        assert_eq!(adapter.queries().len(), 3);
        assert_eq!(record.attempts, 4);
    }

    #[tokio::test]
    async fn test_rate_limited_lookup_ends_unit_without_searching() {
        let property = westin().with_known_identifier(Platform::Booking, "bk-known");
        let adapter = ScriptedAdapter::new(
            Platform::Booking,
            vec![candidates(&[("Westin Sacramento Riverfront", "500 J St, Sacramento, CA", "bk-1")])],
        )
        .with_lookup_step(Script::Fail(SourceError::RateLimited("429 Too Many Requests".into())));
        let record = fast_resolver().resolve(&property, &adapter).await;

        assert_eq!(record.status, ResolutionStatus::ScrapeFailed);
        assert!(record.was_rate_limited());
        assert!(record
            .last_error
            .as_deref()
            .unwrap()
            .starts_with(RATE_LIMITED_MARKER));
        assert_eq!(adapter.lookups(), 1);
        assert!(adapter.queries().is_empty());
        assert!(record.queries_tried.is_empty());
        assert_eq!(record.attempts, 1);
    }

    #[tokio::test]
    async fn test_lookup_timeout_is_kept_when_search_finds_nothing() {
        let property = westin().with_known_identifier(Platform::Booking, "bk-known");
        let adapter = ScriptedAdapter::new(Platform::Booking, Vec::new()).with_lookup_step(Script::Hang);
        let record = fast_resolver().resolve(&property, &adapter).await;

        assert_eq!(record.status, ResolutionStatus::Timeout);
        assert!(record.last_error.as_deref().unwrap().contains("exceeded"));
        assert_eq!(adapter.lookups(), 1);
        assert_eq!(adapter.queries().len(), 3);
        assert_eq!(record.attempts, 4);
    }

    #[tokio::test]
    async fn test_lookup_error_falls_through_to_search() {
        let property = westin().with_known_identifier(Platform::Booking, "bk-known");
        let adapter = ScriptedAdapter::new(
            Platform::Booking,
            vec![candidates(&[("Westin Sacramento Riverfront", "500 J St, Sacramento, CA", "bk-1")])],
        )
        .with_lookup_step(Script::Error("lookup backend returned garbage".into()));
        let record = fast_resolver().resolve(&property, &adapter).await;

        assert_eq!(record.status, ResolutionStatus::Resolved);
        assert_eq!(record.identifier.as_deref(), Some("bk-1"));
        assert_eq!(adapter.queries().len(), 1);
        assert_eq!(record.attempts, 2);
    }

    #[tokio::test]
    async fn test_sister_brand_listing_is_not_resolved() {
        let adapter = ScriptedAdapter::new(
            Platform::Booking,
            vec![candidates(&[(
                "Sheraton Grand Sacramento Hotel",
                "1230 J St, Sacramento, CA",
                "bk-sheraton",
            )])],
        );
        let record = fast_resolver().resolve(&westin(), &adapter).await;

        assert_eq!(record.status, ResolutionStatus::NeedsReview);
        assert_eq!(record.identifier, None);
        assert_eq!(record.candidates[0].verdict.rule, MatchRule::SisterBrand);
        record.check_invariants(0.8).unwrap();
    }

    #[tokio::test]
    async fn test_cancellation_yields_no_record() {
        let token = CancelToken::new();
        let adapter = ScriptedAdapter::new(
            Platform::Booking,
            vec![candidates(&[("Westin Sacramento Riverfront", "500 J St, Sacramento, CA", "bk-1")])],
        )
        .cancelling(token.clone());
        let outcome = fast_resolver()
            .resolve_with_cancel(&westin(), &adapter, &token)
            .await;
        assert!(outcome.is_none());

        let cancelled = CancelToken::new();
        cancelled.cancel();
        let adapter = ScriptedAdapter::new(Platform::Booking, Vec::new());
        assert!(fast_resolver()
            .resolve_with_cancel(&westin(), &adapter, &cancelled)
            .await
            .is_none());
        assert!(adapter.queries().is_empty());
    }

    #[tokio::test]
    async fn test_blank_name_fails_without_queries() {
        let property = Property::new("p-blank", "   ", "Austin", Some("TX"));
        let adapter = ScriptedAdapter::new(Platform::Booking, Vec::new());
        let record = fast_resolver().resolve(&property, &adapter).await;
        assert_eq!(record.status, ResolutionStatus::ScrapeFailed);
        assert_eq!(record.attempts, 0);
    }

    #[tokio::test]
    async fn test_every_script_ends_in_one_terminal_state() {
        let scripts: Vec<Vec<Script>> = vec![
            vec![],
            vec![Script::Candidates(Vec::new()), Script::Error("boom".into())],
            vec![Script::Fail(SourceError::Unavailable("503".into()))],
            vec![Script::Fail(SourceError::Timeout("slow".into()))],
            vec![Script::Fail(SourceError::RateLimited("quota".into()))],
            vec![Script::Panic, Script::Panic, Script::Panic],
            vec![candidates(&[("Citizen Hotel", "", "x")])],
            vec![candidates(&[("Westin Sacramento", "", "")])],
            vec![candidates(&[("The Westin Sacramento", "Reno, NV", "y")])],
            vec![Script::Hang, candidates(&[("Westin Sacramento", "Sacramento", "z")])],
        ];
        let resolver = fast_resolver();
        for script in scripts {
            let adapter = ScriptedAdapter::new(Platform::Booking, script);
            let record = resolver.resolve(&westin(), &adapter).await;
            assert!(ResolutionStatus::ALL.contains(&record.status));
            record.check_invariants(0.8).unwrap();
            assert_eq!(record.queries_tried.len() as u32, record.attempts);
        }
    }

    #[test]
    fn test_confidence_labels() {
        use crate::matching::analyze_match;

        let verdict = analyze_match("Rittenhouse", "Rittenhouse Philadelphia");
        assert_eq!(confidence_for(&verdict), 0.9);
        let verdict = analyze_match(
            "Sanctuary Monterey Bay Dunes Retreat",
            "Monterey Bay Dunes Sanctuary Lodge",
        );
        assert_eq!(confidence_for(&verdict), 0.85);
        let verdict = analyze_match("Park Inn", "Holiday Inn Express");
        assert_eq!(confidence_for(&verdict), 0.3);
    }
}
