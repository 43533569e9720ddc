pub mod channels;
pub mod dynamic;
pub mod indicators;
pub mod levels;
pub mod order_blocks;
pub mod trend;
pub mod volume;
