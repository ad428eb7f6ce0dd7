//! Mark-and-sweep collection over the per-kind pools.
//!
//! Roots are exactly the cells with a non-zero root count; marking follows
//! record values, frame slots and parents, and closure environments with an
//! explicit worklist. Collection only runs at safe points (`Context::tick`,
//! `Context::collect`), never inside an allocation.

use std::time::Instant;

use kiln_core::KindCounts;

use crate::core::{Heap, Root};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcPhase {
    Idle,
    Unmark,
    Mark,
    Sweep,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcReport {
    pub cycle: u64,
    pub marked: usize,
    pub freed: KindCounts,
    pub live: KindCounts,
}

#[derive(Debug)]
pub struct Collector {
    phase: GcPhase,
    interval: u32,
    countdown: u32,
    cycles: u64,
    worklist: Vec<Root>,
}

impl Collector {
    pub fn new(interval: u32) -> Self {
        let interval = interval.max(1);
        Self {
            phase: GcPhase::Idle,
            interval,
            countdown: interval,
            cycles: 0,
            worklist: Vec::new(),
        }
    }

    pub fn phase(&self) -> GcPhase {
        self.phase
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Counts one safe point. Returns `true` when a collection is due.
    pub fn tick(&mut self) -> bool {
        if self.countdown <= 1 {
            self.countdown = self.interval;
            true
        } else {
            self.countdown -= 1;
            false
        }
    }

    pub fn collect(&mut self, heap: &mut Heap) -> GcReport {
        let started = Instant::now();

        self.phase = GcPhase::Unmark;
        heap.clear_marks();

        self.phase = GcPhase::Mark;
        self.worklist.clear();
        heap.held_roots(&mut self.worklist);
        let roots = self.worklist.len();
        let mut marked = 0;
        while let Some(root) = self.worklist.pop() {
            if heap.mark(root) {
                marked += 1;
                heap.trace_children(root, &mut self.worklist);
            }
        }

        self.phase = GcPhase::Sweep;
        let freed = heap.sweep();

        self.phase = GcPhase::Idle;
        self.cycles += 1;
        self.countdown = self.interval;
        let report = GcReport {
            cycle: self.cycles,
            marked,
            freed,
            live: heap.live_counts(),
        };
        tracing::debug!(
            cycle = report.cycle,
            roots,
            marked,
            freed = %report.freed,
            live = %report.live,
            elapsed_us = started.elapsed().as_micros() as u64,
            "gc cycle complete"
        );
        report
    }
}
