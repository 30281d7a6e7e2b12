//! Context-aware caption selection.
//!
//! Each broadcast context carries its own selection criteria: a news
//! segment wants recent high-priority items, a live show tolerates
//! older material, the emergency context repeats a single message at a
//! short interval. The selector binds the queue to whichever context is
//! current.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::info;
use parking_lot::Mutex;

use crate::queue::caption::{Caption, Context, Priority};
use crate::queue::criteria::SelectionCriteria;
use crate::queue::CaptionQueue;

/// Maps the current broadcast context to selection criteria.
pub struct ContextSelector {
    current: Mutex<Context>,
    criteria: Mutex<HashMap<Context, SelectionCriteria>>,
}

impl ContextSelector {
    /// Build a selector with the stock per-context criteria.
    ///
    /// `emergency_interval_secs` is the minimum repeat interval for
    /// emergency captions.
    pub fn new(emergency_interval_secs: u64) -> Self {
        let mut criteria = HashMap::new();

        criteria.insert(
            Context::LiveShow,
            SelectionCriteria {
                min_priority: Priority::Normal,
                max_age_secs: 3_600,
                ..Default::default()
            },
        );
        criteria.insert(
            Context::News,
            SelectionCriteria {
                min_priority: Priority::High,
                max_age_secs: 1_800,
                ..Default::default()
            },
        );
        criteria.insert(
            Context::Emergency,
            SelectionCriteria {
                min_priority: Priority::Emergency,
                max_priority: Priority::Emergency,
                allow_repeats: true,
                max_repeat_count: 0,
                min_repeat_interval_secs: emergency_interval_secs,
                max_age_secs: 86_400,
                ..Default::default()
            },
        );

        Self {
            current: Mutex::new(Context::Automated),
            criteria: Mutex::new(criteria),
        }
    }

    /// Switch the broadcast context.
    pub fn set_context(&self, context: Context) {
        let mut current = self.current.lock();
        if *current != context {
            info!("ContextSelector: context {:?} -> {:?}", *current, context);
            *current = context;
        }
    }

    /// The current broadcast context.
    pub fn context(&self) -> Context {
        *self.current.lock()
    }

    /// Criteria for `context`, falling back to the defaults.
    pub fn criteria_for(&self, context: Context) -> SelectionCriteria {
        self.criteria
            .lock()
            .get(&context)
            .cloned()
            .unwrap_or_default()
    }

    /// Override the criteria used for `context`.
    pub fn set_criteria(&self, context: Context, criteria: SelectionCriteria) {
        self.criteria.lock().insert(context, criteria);
    }

    /// Select the best caption for the current context.
    pub fn select_at(&self, queue: &CaptionQueue, now: DateTime<Utc>) -> Option<Caption> {
        let criteria = self.criteria_for(self.context());
        queue.select_at(&criteria, now)
    }
}
