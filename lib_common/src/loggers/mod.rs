/// Console + file logging through `fern`, with old log pruning.
pub mod setup;

pub use setup::setup_logging;
