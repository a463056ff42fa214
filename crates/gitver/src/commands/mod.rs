//! Command implementations

pub mod calculate;

pub mod config;

pub mod doctor;

pub mod info;
