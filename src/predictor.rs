use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Prediction {
    pub taken: bool,
    pub target: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PredictorEntry {
    pub pc: u32,
    pub taken: bool,
    pub target: Option<u32>,
}

/// One-bit branch history table plus a branch target buffer, both keyed
/// by the control instruction's address. Targets are only recorded for
/// taken outcomes.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BranchPredictor {
    history: BTreeMap<u32, bool>,
    targets: BTreeMap<u32, u32>,
}

impl BranchPredictor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn predict(&self, pc: u32) -> Prediction {
        let fallthrough = pc.wrapping_add(4);
        let taken = self.history.get(&pc).copied().unwrap_or(false);
        let target = if taken {
            self.targets.get(&pc).copied().unwrap_or(fallthrough)
        } else {
            fallthrough
        };
        Prediction { taken, target }
    }

    pub fn update(&mut self, pc: u32, taken: bool, target: u32) {
        self.history.insert(pc, taken);
        if taken {
            self.targets.insert(pc, target);
        }
    }

    pub fn entries(&self) -> Vec<PredictorEntry> {
        self.history
            .iter()
            .map(|(pc, taken)| PredictorEntry {
                pc: *pc,
                taken: *taken,
                target: self.targets.get(pc).copied(),
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.history.clear();
        self.targets.clear();
    }
}
