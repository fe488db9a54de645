//! Skateboard locomotion core: a simulated skate body that switches between
//! free skating and rail grinding, and a follower that presents it.

pub mod components;
pub mod config;
pub mod engine;
pub mod error;
pub mod fsm;
pub mod interface;
pub mod rail;
pub mod scene;
pub mod systems;
