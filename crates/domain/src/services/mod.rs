//! Domain services operating on more than one aggregate.

pub mod dispatch;
pub mod movement;
