// src/resolution/test_support.rs - Scripted in-process adapters for resolution tests
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::models::{MatchCandidate, Platform};
use crate::sources::{SourceAdapter, SourceError};
use crate::utils::cancel::CancelToken;

/// One scripted response to a `search` or `fetch_by_id` call.
pub enum Step {
    Candidates(Vec<MatchCandidate>),
    Fail(SourceError),
    Error(String),
    Hang,
    Panic,
}

pub fn candidates(list: &[(&str, &str, &str)]) -> Step {
    Step::Candidates(
        list.iter()
            .map(|(name, address, id)| {
                MatchCandidate::new(name)
                    .with_address(address)
                    .with_identifier(id)
            })
            .collect(),
    )
}

async fn play(step: Step) -> Result<Vec<MatchCandidate>> {
    match step {
        Step::Candidates(list) => Ok(list),
        Step::Fail(err) => Err(err.into()),
        Step::Error(msg) => Err(anyhow!(msg)),
        Step::Hang => {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        }
        Step::Panic => panic!("scripted adapter panic"),
    }
}

/// Answers `search` calls from a fixed script; once the script runs out it returns nothing.
pub struct ScriptedAdapter {
    platform: Platform,
    steps: Mutex<VecDeque<Step>>,
    queries: Mutex<Vec<String>>,
    lookup: Option<MatchCandidate>,
    lookup_step: Mutex<Option<Step>>,
    lookup_scripted: bool,
    lookups: AtomicUsize,
    cancel_on_search: Option<CancelToken>,
}

impl ScriptedAdapter {
    pub fn new(platform: Platform, steps: Vec<Step>) -> Self {
        Self {
            platform,
            steps: Mutex::new(steps.into()),
            queries: Mutex::new(Vec::new()),
            lookup: None,
            lookup_step: Mutex::new(None),
            lookup_scripted: false,
            lookups: AtomicUsize::new(0),
            cancel_on_search: None,
        }
    }

    pub fn with_lookup(mut self, candidate: MatchCandidate) -> Self {
        self.lookup = Some(candidate);
        self
    }

    /// Answers the first `fetch_by_id` call with `step` instead of a fixed candidate.
    pub fn with_lookup_step(mut self, step: Step) -> Self {
        self.lookup_step = Mutex::new(Some(step));
        self.lookup_scripted = true;
        self
    }

    /// Fires `token` during the first search, as if a shutdown arrived mid-call.
    pub fn cancelling(mut self, token: CancelToken) -> Self {
        self.cancel_on_search = Some(token);
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceAdapter for ScriptedAdapter {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn search(&self, query: &str) -> Result<Vec<MatchCandidate>> {
        self.queries.lock().unwrap().push(query.to_string());
        if let Some(token) = &self.cancel_on_search {
            token.cancel();
        }
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            None => Ok(Vec::new()),
            Some(step) => play(step).await,
        }
    }

    fn supports_lookup(&self) -> bool {
        self.lookup.is_some() || self.lookup_scripted
    }

    async fn fetch_by_id(&self, _identifier: &str) -> Result<Option<MatchCandidate>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let step = self.lookup_step.lock().unwrap().take();
        match step {
            None => Ok(self.lookup.clone()),
            Some(step) => Ok(play(step).await?.into_iter().next()),
        }
    }
}
