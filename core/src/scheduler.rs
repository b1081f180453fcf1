use std::collections::BinaryHeap;

use crate::time::{ScheduledTurn, TurnClock};

/// Work performed during a turn. Declaration order is execution order within
/// the same turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TurnPhase {
    RandomEvents,
    DiplomaticPulse,
    Research,
    Espionage,
    SecurityReview,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleSpec {
    EveryTurn,
    EveryTurns(u32),
}

impl ScheduleSpec {
    fn next_execution_turn(&self, last_execution: u32) -> u32 {
        match self {
            ScheduleSpec::EveryTurn => last_execution + 1,
            ScheduleSpec::EveryTurns(turns) => last_execution + (*turns).max(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub phase: TurnPhase,
    pub due: ScheduledTurn,
    pub schedule_spec: Option<ScheduleSpec>,
}

impl ScheduledTask {
    pub fn new(phase: TurnPhase, due_turn: u32) -> Self {
        Self {
            phase,
            due: ScheduledTurn::new(due_turn),
            schedule_spec: None,
        }
    }

    pub fn with_schedule(mut self, spec: ScheduleSpec) -> Self {
        self.schedule_spec = Some(spec);
        self
    }

    fn reschedule(&self) -> Option<Self> {
        self.schedule_spec.map(|spec| {
            let mut next_task = self.clone();
            next_task.due = ScheduledTurn::new(spec.next_execution_turn(self.due.turn));
            next_task
        })
    }
}

impl Ord for ScheduledTask {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.due
            .cmp(&other.due)
            .then_with(|| other.phase.cmp(&self.phase))
    }
}

impl PartialOrd for ScheduledTask {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Default, Debug)]
pub struct Scheduler {
    tasks: BinaryHeap<ScheduledTask>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            tasks: BinaryHeap::new(),
        }
    }

    pub fn schedule(&mut self, task: ScheduledTask) {
        self.tasks.push(task);
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn peek_next_turn(&self) -> Option<u32> {
        self.tasks.peek().map(|task| task.due.turn)
    }

    /// Pops every task due at or before the clock's turn, in phase order, and
    /// requeues the recurring ones.
    pub fn next_ready_tasks(&mut self, clock: &TurnClock) -> Vec<ScheduledTask> {
        let current = clock.turn();
        let mut ready = Vec::new();
        while self
            .tasks
            .peek()
            .is_some_and(|task| task.due.turn <= current)
        {
            let Some(task) = self.tasks.pop() else {
                break;
            };
            ready.push(task);
        }
        for task in &ready {
            if let Some(next_task) = task.reschedule() {
                self.schedule(next_task);
            }
        }
        ready
    }
}
