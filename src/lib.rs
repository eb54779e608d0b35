// Library root
// -----------
// Client for the Funix Cloud deployment platform. The binary (`main.rs`)
// parses the command line and hands a `Session` to the functions in
// `commands`.
//
// Module responsibilities:
// - `api`: HTTP calls to the Funix Cloud server and their payload types.
// - `codes`: response codes and the messages shown for them.
// - `config`: the persisted server URL and bearer token.
// - `package`: zipping projects for upload and sniffing existing archives.
// - `render` / `ui`: terminal output and prompts.
// - `validate`: local checks run before any request.
pub mod api;
pub mod codes;
pub mod commands;
pub mod config;
pub mod error;
pub mod package;
pub mod render;
pub mod session;
pub mod ui;
pub mod validate;

pub use error::CliError;
pub use session::Session;
