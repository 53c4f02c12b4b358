//! API route handlers

pub mod pages;
pub mod status;
