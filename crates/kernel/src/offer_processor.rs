// Copyright (C) 2025 Launchpad Contributors
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Drives exactly one offer end to end: match, persist, decide, launch. Owns the two
//! deadlines and the strict `created -> store -> (launch | terminated)` ordering per task.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use launchpad_common::model::{LaunchSpec, MatchedTasks, Offer, TaskWithSource};

use crate::clock::Clock;
use crate::offer_matcher_manager::OfferMatching;
use crate::task_launcher::TaskLauncher;
use crate::task_tracker::TaskTracker;

pub struct OfferProcessorConfig {
    pub offer_matching_timeout: Duration,
    pub save_tasks_to_launch_timeout: Duration,
    pub decline_offer_duration: i64,
}

pub struct OfferProcessor {
    matcher: Arc<dyn OfferMatching>,
    tracker: Arc<TaskTracker>,
    task_launcher: Arc<dyn TaskLauncher>,
    clock: Arc<dyn Clock>,
    config: OfferProcessorConfig,
}

impl OfferProcessor {
    pub fn new(
        matcher: Arc<dyn OfferMatching>,
        tracker: Arc<TaskTracker>,
        task_launcher: Arc<dyn TaskLauncher>,
        clock: Arc<dyn Clock>,
        config: OfferProcessorConfig,
    ) -> Self {
        Self {
            matcher,
            tracker,
            task_launcher,
            clock,
            config,
        }
    }

    /// Process `offer` exactly once; guaranteed to answer it with either `launch_tasks` or
    /// `decline_offer` before returning.
    pub fn process_offer(&self, offer: Offer) {
        let matching_deadline = self.clock.now() + self.config.offer_matching_timeout;
        let saving_deadline = matching_deadline + self.config.save_tasks_to_launch_timeout;

        let matched = self.match_offer(matching_deadline, offer.clone());
        let resend_this_offer = matched.resend_this_offer;

        let (survivors, not_all_saved) = self.persist(matched.tasks, saving_deadline);

        if survivors.is_empty() {
            let refuse_millis = if resend_this_offer || not_all_saved {
                None
            } else {
                Some(self.config.decline_offer_duration)
            };
            self.task_launcher.decline_offer(&offer.id, refuse_millis);
            return;
        }

        self.launch(offer.id, survivors);
    }

    fn match_offer(&self, deadline: std::time::Instant, offer: Offer) -> MatchedTasks {
        let offer_id = offer.id.clone();
        catch_unwind(AssertUnwindSafe(|| self.matcher.match_offer(deadline, offer)))
            .unwrap_or_else(|_| MatchedTasks::empty(offer_id, true))
    }

    /// Persist matched tasks in order, stopping and rejecting the remainder once the save
    /// deadline passes. Returns the surviving tasks plus whether any rejection occurred.
    fn persist(
        &self,
        tasks: Vec<TaskWithSource>,
        saving_deadline: std::time::Instant,
    ) -> (Vec<TaskWithSource>, bool) {
        let mut survivors = Vec::new();
        let mut not_all_saved = false;
        let mut iter = tasks.into_iter();

        while let Some(task_with_source) = iter.next() {
            if self.clock.now() > saving_deadline {
                task_with_source.source.reject("saving timeout reached".to_string());
                not_all_saved = true;
                for remaining in iter {
                    remaining.source.reject("saving timeout reached".to_string());
                }
                break;
            }

            self.tracker.created(task_with_source.task.clone());
            match self.tracker.store(task_with_source.task.clone()).recv() {
                Ok(Ok(())) => survivors.push(task_with_source),
                Ok(Err(err)) => {
                    let _ = self
                        .tracker
                        .terminated(&task_with_source.task.app_id, &task_with_source.task.task_id)
                        .recv();
                    not_all_saved = true;
                    task_with_source.source.reject(err.to_string());
                }
                Err(_) => {
                    let _ = self
                        .tracker
                        .terminated(&task_with_source.task.app_id, &task_with_source.task.task_id)
                        .recv();
                    not_all_saved = true;
                    task_with_source
                        .source
                        .reject(launchpad_common::error::TaskStoreError::WriterGone.to_string());
                }
            }
        }

        (survivors, not_all_saved)
    }

    fn launch(&self, offer_id: launchpad_common::model::OfferId, survivors: Vec<TaskWithSource>) {
        let launch_specs: Vec<LaunchSpec> = survivors.iter().map(|t| t.launch_spec.clone()).collect();
        let accepted = self.task_launcher.launch_tasks(&offer_id, &launch_specs);

        if accepted {
            for task_with_source in survivors {
                task_with_source.source.accept();
            }
            return;
        }

        for task_with_source in survivors {
            let _ = self
                .tracker
                .terminated(&task_with_source.task.app_id, &task_with_source.task.task_id)
                .recv();
            task_with_source.source.reject("driver unavailable".to_string());
        }
    }
}
