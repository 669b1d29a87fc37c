// Library root
// -----------
// This crate exposes the pieces of the MT5 admin console as a library. The
// binary (`main.rs`) wires them together into the interactive CLI.
//
// Module responsibilities:
// - `api`: blocking HTTP client for the bot's admin service; every call
//   returns a tagged `Failure` instead of printing or panicking.
// - `error`: the `Failure` kinds.
// - `model`: response shapes decoded from the service.
// - `poll`: the realtime polling loop, its one-shot cancellation token and
//   Ctrl-C routing.
// - `config`: command-line flags, the saved server and logging setup.
// - `render`: text formatting for the terminal.
// - `ui`: menus and prompts that drive all of the above.
pub mod api;
pub mod config;
pub mod error;
pub mod model;
pub mod poll;
pub mod render;
pub mod ui;
