pub mod action;
pub mod follow;
