//Rust hates greek characters
#![allow(confusable_idents)]

pub mod algebra;
pub mod solver;
pub mod timers;
