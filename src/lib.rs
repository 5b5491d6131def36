//! # trackview - Terminal Annotation Track Viewer
//!
//! A terminal viewer for annotation tracks laid out along DNA sequences,
//! built on ratatui.
//!
//! ## Architecture
//!
//! The layout core is independent of the terminal:
//! - `coords`: genomic position to screen offset mapping
//! - `viewport`: per-sequence zoom, pan and alignment state
//! - `packer`: greedy row assignment for the expanded layout
//! - `planner`: geometry, colour and label of every visible region
//! - `filter`: visualization filters deciding colours and visibility
//! - `view`: the facade tying data, settings, viewports and caches together
//!
//! Around it:
//! - `model`: sequences, regions, tracks and the application state
//! - `session` / `loader`: session files, loaded on a background thread
//! - `settings`: display and layout settings (YAML)
//! - `event` / `ui` / `controller`: Vim-style keys, rendering, main loop
//! - `report`: plain-text layout output for the CLI mode

pub mod changes;
pub mod color;
pub mod controller;
pub mod coords;
pub mod event;
pub mod filter;
pub mod loader;
pub mod model;
pub mod packer;
pub mod planner;
pub mod report;
pub mod session;
pub mod settings;
pub mod ui;
pub mod view;
pub mod viewport;
