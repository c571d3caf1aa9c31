pub mod assembler;
pub mod harvester;

pub use assembler::assemble;
pub use harvester::harvest;
