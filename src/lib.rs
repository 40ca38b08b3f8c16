//! # Duel Client
//!
//! Interactive client for head-to-head coding duels.
//!
//! A session goes through the following steps:
//! - Log in with a nickname and password ([`Gateway::login`](crate::gateway::Gateway::login))
//! - Enter the duel queue: a listener thread reads the server event stream
//!   ([`DuelController::connect`](crate::controller::DuelController::connect))
//! - When the duel starts, print the opponent and the task ([`controller`])
//! - Send solutions with `submit <path>`; each submission is polled on its own thread until it
//!   is graded ([`DuelController::submit`](crate::controller::DuelController::submit))
//! - When the duel finishes, print the result, stop every worker and return
//!
//! Every request goes through the [`Gateway`](crate::gateway::Gateway), which attaches the
//! access token and refreshes expired tokens once before retrying.
//!
//! # Threads
//!
//! - the prompt thread, blocked on user input
//! - one listener thread, blocked on the event stream
//! - one thread per submission being graded, sleeping between two status requests
//!
//! They share the tokens ([`CredentialStore`](crate::credentials::CredentialStore)) and a
//! [`ShutdownSignal`]. The client state is only written by the
//! [`DuelController`](crate::controller::DuelController).
//!
//! # Usage Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use duel_client::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Configuration::from_env();
//!     let console: Arc<dyn Console> = Arc::new(StdoutConsole);
//!
//!     let transport = Arc::new(HttpTransport::new(config.request_timeout())?);
//!     let gateway = Arc::new(Gateway::new(transport, CredentialStore::new(), config.base_url()));
//!     gateway.login("alice", "secret")?;
//!
//!     let controller = DuelController::new(DuelApi::new(gateway), console.clone(), config);
//!     controller.connect()?;
//!
//!     let stdin = std::io::BufReader::new(std::io::stdin());
//!     match repl::run(&controller, console, stdin)? {
//!         Exit::DuelOver(end) => println!("{end:?}"),
//!         Exit::InputClosed => {}
//!     }
//!     Ok(())
//! }
//! ```
#![warn(missing_docs)]

pub use anyhow;

pub mod api;
pub mod configuration;
pub mod console;
pub mod controller;
pub mod credentials;
pub mod error;
pub mod gateway;
pub mod language;
mod listener;
pub mod logger;
mod poller;
pub mod repl;
mod shutdown;
mod stream;
#[cfg(test)]
mod testing;
pub mod transport;

pub use shutdown::ShutdownSignal;

/// Commonly used types and traits for quick access.
///
/// Import this prelude to get started easily:
/// ```rust
/// use duel_client::prelude::*;
/// ```
pub mod prelude {
    pub use crate::api::DuelApi;
    pub use crate::configuration::Configuration;
    pub use crate::console::{Console, StdoutConsole};
    pub use crate::controller::{DuelController, Phase, SessionEnd};
    pub use crate::credentials::CredentialStore;
    pub use crate::error::{ClientError, ValidationError};
    pub use crate::gateway::Gateway;
    pub use crate::repl::{self, Exit};
    pub use crate::transport::HttpTransport;
}
