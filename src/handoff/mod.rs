//! Handing an update over from a running application to the updater process.
//!
//! ```text
//! application process                        updater process
//! ───────────────────                        ───────────────
//! Handoff::run(app, behavior, creds)
//!   ├── ArgumentCodec::encode ── argv ──────▶ Updater::run(argv)
//!   ├── spawn detached                         ├── ArgumentCodec::decode
//!   └── exit                                   ├── UpdateEngine::update_with
//!                                              └── message / silence / relaunch
//! ```
//!
//! The arguments are the only channel between the two processes, and it only goes one
//! way; see [`codec`] for the wire format.

pub mod caller;
pub mod codec;
pub mod console;
pub mod updater;

pub use caller::{Handoff, UpdaterStatus};
pub use codec::{ArgumentCodec, HandoffRequest};
pub use console::{ConsoleUi, UpdaterUi};
pub use updater::{Updater, UpdaterOutcome, failure_message};
