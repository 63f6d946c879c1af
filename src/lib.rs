// Library root
// -----------
// Module responsibilities:
// - `api`: blocking HTTP client for the Matrix login/logout endpoints and
//   the Synapse admin endpoints, plus the request/response shapes.
// - `cli`: argument parsing and the per-command dispatcher.
// - `sweep`: bulk room cleanup (filter, protected-list failsafe, confirm,
//   delete loop).
// - `ui`: terminal prompts and JSON output formatting.
pub mod api;
pub mod cli;
pub mod sweep;
pub mod ui;
