//! # ArmaDEX Shell - Library Root
//!
//! Application shell around the wallet connection core. The binary
//! (`armadex`) wires configuration, logging and the collaborators together;
//! everything it uses lives here so it can be tested without a terminal.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │              terminal (this crate)                     │
//! │  app    - screens, connect modal, UI events            │
//! │  debug  - tracing subscriber, log files, panic hook    │
//! └───────────────┬────────────────────────────────────────┘
//!                 │
//! ┌───────────────▼────────────────────────────────────────┐
//! │  lib-wallet   - session controller, strategies         │
//! │  lib-core     - configuration, error taxonomy          │
//! │  shared       - snapshot DTOs, address helpers         │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin armadex              # restore a previous session only
//! cargo run --bin armadex -- browser   # connect through the RPC endpoint's accounts
//! cargo run --bin armadex -- pairing   # remote pairing
//! ```

pub mod app;
pub mod debug;

pub use app::{App, AppEvent, Screen};
