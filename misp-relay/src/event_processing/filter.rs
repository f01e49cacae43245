//! Multi-filter event intersection
//!
//! With no filter sets the unfiltered collection is returned as fetched.
//! Otherwise each set is searched independently and only events whose id is
//! present in every result survive, in the order of the first set's result.

use crate::configuration::FilterSet;
use crate::errors::Result;
use crate::source::EventSource;
use log::{debug, info};
use misp_relay_common::RawEvent;
use std::collections::HashSet;

pub struct EventFilterIntersector<'a, S: EventSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: EventSource + ?Sized> EventFilterIntersector<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    pub fn fetch(&self, filters: &[FilterSet]) -> Result<Vec<RawEvent>> {
        let Some((first, rest)) = filters.split_first() else {
            let events = self.source.search(None)?;
            info!("Fetched {} events without filters", events.len());
            return Ok(events);
        };

        let first_events = self.search(first)?;
        let mut common_ids = event_ids(&first_events);

        for filter in rest {
            let ids = event_ids(&self.search(filter)?);
            common_ids = common_ids.intersection(&ids).cloned().collect();
        }

        let events: Vec<RawEvent> = first_events
            .into_iter()
            .filter(|event| common_ids.contains(&event.id))
            .collect();

        info!(
            "{} events match all {} filter sets",
            events.len(),
            filters.len()
        );
        Ok(events)
    }

    fn search(&self, filter: &FilterSet) -> Result<Vec<RawEvent>> {
        let events = self.source.search(Some(&filter.criteria))?;
        debug!("Filter set '{}' matched {} events", filter.name, events.len());
        Ok(events)
    }
}

fn event_ids(events: &[RawEvent]) -> HashSet<String> {
    events.iter().map(|event| event.id.clone()).collect()
}
