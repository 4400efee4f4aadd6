//! Aggregated outcome of a headless run.

use std::{collections::BTreeMap, fmt};

use depths_session::{Session, TurnReport};
use depths_system_missions::{Mission, MissionOutcome};
use depths_world::query;
use serde::Serialize;

/// Landmarks of one generated floor.
#[derive(Clone, Debug, Serialize)]
pub(crate) struct FloorSummary {
    pub(crate) number: u32,
    pub(crate) stairways: usize,
    pub(crate) objectives: usize,
}

/// Mission that was put in front of the viewer.
#[derive(Clone, Debug, Serialize)]
pub(crate) struct OfferSummary {
    pub(crate) name: String,
    pub(crate) floor: u32,
    pub(crate) path_length: usize,
    pub(crate) time_limit: u32,
    pub(crate) score: u32,
}

impl From<&Mission> for OfferSummary {
    fn from(mission: &Mission) -> Self {
        Self {
            name: mission.name().to_owned(),
            floor: mission.target().floor().get(),
            path_length: mission.path_length(),
            time_limit: mission.time_limit(),
            score: mission.score(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub(crate) struct Summary {
    pub(crate) seed: u64,
    pub(crate) turns: u64,
    pub(crate) final_floor: u32,
    pub(crate) floors: Vec<FloorSummary>,
    pub(crate) revealed_tiles: usize,
    pub(crate) offers: Vec<OfferSummary>,
    pub(crate) missions_succeeded: usize,
    pub(crate) missions_failed: usize,
    pub(crate) score: u32,
    pub(crate) cues: BTreeMap<&'static str, usize>,
}

impl Summary {
    pub(crate) fn new(seed: u64, turns: u64) -> Self {
        Self {
            seed,
            turns,
            final_floor: 0,
            floors: Vec::new(),
            revealed_tiles: 0,
            offers: Vec::new(),
            missions_succeeded: 0,
            missions_failed: 0,
            score: 0,
            cues: BTreeMap::new(),
        }
    }

    pub(crate) fn record_turn(&mut self, report: &TurnReport) {
        self.revealed_tiles += report.visibility.revealed.len();
        for cue in &report.cues {
            *self.cues.entry(cue.name()).or_insert(0) += 1;
        }
        match report.mission.as_ref().map(Mission::outcome) {
            Some(MissionOutcome::Success) => self.missions_succeeded += 1,
            Some(MissionOutcome::Failure) => self.missions_failed += 1,
            _ => {}
        }
    }

    pub(crate) fn record_offers(&mut self, offers: &[Mission]) {
        self.offers.extend(offers.iter().map(OfferSummary::from));
    }

    /// Captures the state the session ended in.
    pub(crate) fn finish(&mut self, session: &Session) {
        self.final_floor = session.current_floor().get();
        self.score = session.board().total_score();
        self.floors = query::floors(session.world())
            .iter()
            .map(|floor| FloorSummary {
                number: floor.number().get(),
                stairways: floor.stairways().len(),
                objectives: floor.objectives().len(),
            })
            .collect();
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "seed {} after {} turns", self.seed, self.turns)?;
        writeln!(f, "reached floor {}", self.final_floor)?;
        for floor in &self.floors {
            writeln!(
                f,
                "  floor {}: {} stairways, {} objectives",
                floor.number, floor.stairways, floor.objectives
            )?;
        }
        writeln!(f, "revealed {} tiles", self.revealed_tiles)?;
        writeln!(f, "offered {} missions", self.offers.len())?;
        for offer in &self.offers {
            writeln!(
                f,
                "  {} on floor {} ({} tiles, {} turns, {} points)",
                offer.name, offer.floor, offer.path_length, offer.time_limit, offer.score
            )?;
        }
        writeln!(
            f,
            "missions: {} succeeded, {} failed, score {}",
            self.missions_succeeded, self.missions_failed, self.score
        )?;
        let cues: Vec<_> = self
            .cues
            .iter()
            .map(|(name, count)| format!("{name}={count}"))
            .collect();
        writeln!(f, "cues: {}", cues.join(" "))
    }
}
