use serde::Serialize;

/// Reset value of x2.
pub const DEFAULT_STACK_POINTER: u32 = 0x7FFF_FFDC;
pub const SP: u8 = 2;

/// The 32 integer registers. x0 reads as zero and ignores writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterFile {
    regs: [u32; 32],
}

impl RegisterFile {
    pub fn new(stack_pointer: u32) -> Self {
        let mut regs = [0; 32];
        regs[SP as usize] = stack_pointer;
        Self { regs }
    }

    pub fn read(&self, r: u8) -> u32 {
        self.regs[(r & 0x1F) as usize]
    }

    pub fn write(&mut self, r: u8, val: u32) {
        if r != 0 {
            self.regs[(r & 0x1F) as usize] = val;
        }
    }

    pub fn as_array(&self) -> &[u32; 32] {
        &self.regs
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new(DEFAULT_STACK_POINTER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn x0_is_hardwired() {
        let mut rf = RegisterFile::default();
        rf.write(0, 123);
        rf.write(5, 7);
        assert_eq!(rf.read(0), 0);
        assert_eq!(rf.read(5), 7);
        assert_eq!(rf.read(SP), DEFAULT_STACK_POINTER);
    }
}
