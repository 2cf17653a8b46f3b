mod cases;
mod setup;

pub use setup::setup;
