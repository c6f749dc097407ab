//! Swipeshot - Three-finger swipe-to-screenshot
//!
//! Recognizes three fingers sliding down a touchscreen together and triggers a
//! screenshot.

pub mod config;
pub mod gesture;
pub mod input;
pub mod screen;
pub mod service;
