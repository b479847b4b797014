pub struct Local {
    pub name: String,
    pub depth: u32,
    pub reg: u8,
    pub mutable: bool,
}

#[derive(Debug, Clone)]
pub struct LoopContext {
    /// Where `continue` jumps to.
    pub start_label: u16,
    /// `break` jumps waiting for the loop's exit address.
    pub break_jumps: Vec<usize>,
}
