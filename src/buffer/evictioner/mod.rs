//! Evictioner family (spec §4.7): pluggable victim-selection strategies.
//!
//! Each family is dispatched through the [`EvictionPolicy`] enum rather than
//! a `dyn Evictioner` trait object, so that `pick_victim` can hold the
//! frame's conditional EX latch across selection without fighting object
//! safety (see `crate::common::config::EvictionPolicyConfig`, which this
//! enum mirrors one-to-one).

pub mod car;
pub mod lean_store;
pub mod select_and_filter;

use crate::common::config::EvictionPolicyConfig;
use crate::common::FrameId;
use car::Car;
use lean_store::LeanStoreCooling;
use select_and_filter::{Cursor, Filter, FilterState};
use std::collections::HashMap;
use std::sync::Mutex;

/// Runtime eviction policy state, constructed once per buffer pool from its
/// [`EvictionPolicyConfig`].
pub enum EvictionPolicy {
    SelectAndFilter {
        cursor: Cursor,
        filter: Filter,
        early_filter: bool,
        frame_count: usize,
        states: Mutex<HashMap<FrameId, FilterState>>,
    },
    Car(Mutex<Car>),
    LeanStore(Mutex<LeanStoreCooling>),
}

impl EvictionPolicy {
    pub fn new(config: &EvictionPolicyConfig, frame_count: usize) -> Self {
        match config {
            EvictionPolicyConfig::SelectAndFilter {
                selector,
                filter,
                early_filter,
            } => EvictionPolicy::SelectAndFilter {
                cursor: Cursor::new(*selector, frame_count),
                filter: *filter,
                early_filter: *early_filter,
                frame_count,
                states: Mutex::new(HashMap::new()),
            },
            EvictionPolicyConfig::Car { capacity } => EvictionPolicy::Car(Mutex::new(Car::new(*capacity))),
            EvictionPolicyConfig::LeanStoreCooling { cooling_fraction } => {
                EvictionPolicy::LeanStore(Mutex::new(LeanStoreCooling::new(*cooling_fraction)))
            }
        }
    }

    /// Record a successful fix against `frame` (caching `page_id`), feeding
    /// whichever recency structure the active policy maintains.
    pub fn record_access(&self, frame: FrameId, page_id: u32) {
        match self {
            EvictionPolicy::SelectAndFilter { filter, states, .. } => {
                let mut states = states.lock().unwrap();
                states
                    .entry(frame)
                    .or_insert_with(FilterState::new)
                    .record_access(*filter);
            }
            EvictionPolicy::Car(car) => car.lock().unwrap().record_access(frame, page_id),
            EvictionPolicy::LeanStore(ls) => ls.lock().unwrap().record_access(frame),
        }
    }

    /// Select an eviction victim, consulting `is_evictable` for each
    /// candidate (spec §4.6.3: unpinned, not `check_recovery`, latch
    /// conditionally acquirable). Returns `None` if the policy could not
    /// find one within its internal attempt budget.
    pub fn pick_victim<F: Fn(FrameId) -> bool>(&self, is_evictable: F) -> Option<FrameId> {
        match self {
            EvictionPolicy::SelectAndFilter {
                cursor,
                filter,
                early_filter,
                frame_count,
                states,
            } => {
                for _ in 0..(*frame_count).max(1) {
                    let candidate = cursor.advance();
                    if *early_filter {
                        // Apply the filter before the (conditional-latch-like)
                        // is_evictable check, so a candidate the filter would
                        // reject never pays that cost.
                        let mut states = states.lock().unwrap();
                        let accept = states
                            .entry(candidate)
                            .or_insert_with(FilterState::new)
                            .visit(*filter);
                        drop(states);
                        if accept && is_evictable(candidate) {
                            return Some(candidate);
                        }
                    } else {
                        if !is_evictable(candidate) {
                            continue;
                        }
                        let mut states = states.lock().unwrap();
                        let accept = states
                            .entry(candidate)
                            .or_insert_with(FilterState::new)
                            .visit(*filter);
                        if accept {
                            return Some(candidate);
                        }
                    }
                }
                None
            }
            EvictionPolicy::Car(car) => car.lock().unwrap().pick_victim(is_evictable),
            EvictionPolicy::LeanStore(ls) => ls.lock().unwrap().pick_victim(is_evictable),
        }
    }

    /// Whether this policy should, before picking, first run a maintenance
    /// sweep (LeanStore's hot->cool pass has no equivalent in the other two
    /// families, so this returns frames that must be unswizzled by the
    /// caller before they are truly evictable).
    pub fn maintenance_pass(&self) -> Vec<FrameId> {
        match self {
            EvictionPolicy::LeanStore(ls) => ls.lock().unwrap().cool_pass(),
            _ => Vec::new(),
        }
    }
}
