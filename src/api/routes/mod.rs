//! API Routes
//!
//! Route handlers organized by dashboard widget.

pub mod actions;
pub mod alerts;
pub mod buildings;
pub mod date;
pub mod graph;
pub mod health;
pub mod reports;
