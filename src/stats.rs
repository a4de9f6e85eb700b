use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub cycles: u64,
    /// Instructions that completed write-back, the halt excluded.
    pub instructions: u64,
    pub alu_instructions: u64,
    pub data_transfer_instructions: u64,
    pub control_instructions: u64,
    pub stalls: u64,
    pub data_hazards: u64,
    pub control_hazards: u64,
    pub mispredictions: u64,
    pub data_stalls: u64,
    pub control_stalls: u64,
}

impl Stats {
    pub fn cpi(&self) -> f64 {
        if self.instructions == 0 {
            0.0
        } else {
            self.cycles as f64 / self.instructions as f64
        }
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total cycles:                 {}", self.cycles)?;
        writeln!(f, "Instructions executed:        {}", self.instructions)?;
        writeln!(f, "CPI:                          {:.3}", self.cpi())?;
        writeln!(f, "Data-transfer instructions:   {}", self.data_transfer_instructions)?;
        writeln!(f, "ALU instructions:             {}", self.alu_instructions)?;
        writeln!(f, "Control instructions:         {}", self.control_instructions)?;
        writeln!(f, "Stalls/bubbles:               {}", self.stalls)?;
        writeln!(f, "Data hazards:                 {}", self.data_hazards)?;
        writeln!(f, "Control hazards:              {}", self.control_hazards)?;
        writeln!(f, "Branch mispredictions:        {}", self.mispredictions)?;
        writeln!(f, "Stalls due to data hazards:   {}", self.data_stalls)?;
        write!(f, "Stalls due to control hazards: {}", self.control_stalls)
    }
}
