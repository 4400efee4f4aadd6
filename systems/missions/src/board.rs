//! Lifecycle of the mission the viewer has accepted.

use depths_core::{Event, TilePosition};
use tracing::info;

use crate::{Mission, MissionOutcome};

/// Mission currently being attempted together with the turns spent on it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveMission {
    mission: Mission,
    turns_taken: u32,
}

impl ActiveMission {
    /// Mission being attempted.
    #[must_use]
    pub fn mission(&self) -> &Mission {
        &self.mission
    }

    /// Turns elapsed since the mission was accepted.
    #[must_use]
    pub fn turns_taken(&self) -> u32 {
        self.turns_taken
    }

    /// Turns left before the mission fails.
    #[must_use]
    pub fn turns_remaining(&self) -> u32 {
        self.mission.time_limit().saturating_sub(self.turns_taken)
    }
}

/// Tracks the accepted mission, the running score and per-floor completions.
#[derive(Clone, Debug, Default)]
pub struct MissionBoard {
    active: Option<ActiveMission>,
    completed_this_floor: usize,
    total_score: u32,
    resolved: Vec<Mission>,
}

impl MissionBoard {
    /// Starts attempting `mission`, abandoning any mission already in progress.
    pub fn accept(&mut self, mission: Mission) {
        info!(
            name = mission.name(),
            time_limit = mission.time_limit(),
            score = mission.score(),
            "mission_accepted"
        );
        self.active = Some(ActiveMission {
            mission,
            turns_taken: 0,
        });
    }

    /// Mission currently in progress.
    #[must_use]
    pub fn active(&self) -> Option<&ActiveMission> {
        self.active.as_ref()
    }

    /// Missions completed since the viewer entered the current floor.
    #[must_use]
    pub fn completed_this_floor(&self) -> usize {
        self.completed_this_floor
    }

    /// Sum of the scores of every successful mission.
    #[must_use]
    pub fn total_score(&self) -> u32 {
        self.total_score
    }

    /// Missions that ended, in resolution order.
    #[must_use]
    pub fn resolved(&self) -> &[Mission] {
        &self.resolved
    }

    /// Advances the active mission using the events of one turn.
    ///
    /// `viewer` is the viewer's position after the events were applied. The
    /// mission succeeds when the viewer stands on its target and fails once
    /// the turns taken reach its time limit. A resolved mission is returned
    /// with its outcome set and the board is left without an active mission.
    pub fn handle(&mut self, events: &[Event], viewer: TilePosition) -> Option<Mission> {
        for event in events {
            match event {
                Event::FloorEntered { .. } => self.completed_this_floor = 0,
                Event::TimeAdvanced { .. } => {
                    if let Some(active) = self.active.as_mut() {
                        active.turns_taken = active.turns_taken.saturating_add(1);
                    }
                }
                _ => {}
            }
        }

        let active = self.active.as_ref()?;
        let outcome = if active.mission.target() == viewer {
            MissionOutcome::Success
        } else if active.turns_taken >= active.mission.time_limit() {
            MissionOutcome::Failure
        } else {
            return None;
        };

        let mut mission = self.active.take()?.mission;
        mission.outcome = outcome;
        if outcome == MissionOutcome::Success {
            self.total_score = self.total_score.saturating_add(mission.score());
            self.completed_this_floor += 1;
        }
        info!(
            name = mission.name(),
            outcome = ?outcome,
            total_score = self.total_score,
            "mission_resolved"
        );
        self.resolved.push(mission.clone());
        Some(mission)
    }
}
