pub mod actions;
pub mod citations;
pub mod components;
pub mod config;
pub mod contracts;
pub mod events;
pub mod reducer;
pub mod segment;
pub mod state;
pub mod transcript;
pub mod viewer;

pub use actions::*;
pub use reducer::*;
pub use state::*;

pub use transcript::*;
