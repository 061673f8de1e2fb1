//! API handlers

pub mod attachments;
