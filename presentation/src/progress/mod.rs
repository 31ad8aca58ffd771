//! Deployment progress display

pub mod reporter;
