pub mod activities;
pub mod report;
