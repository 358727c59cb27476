//! An activity stream for documents of a host application: who did what to
//! which document, who follows whom, and the feeds that follow from that.

pub mod api;
pub mod common;
pub mod config;
pub mod db;
pub mod entity;
pub mod integrity;
pub mod migration;
pub mod model;
pub mod query;
pub mod registry;
pub mod stream;
pub mod test;
pub mod timesince;
pub mod trace;
