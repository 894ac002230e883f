pub mod app;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod emit;
pub mod error;
pub mod fetch;
pub mod fs_util;
pub mod grid;
pub mod output;
pub mod planner;
pub mod projection;
