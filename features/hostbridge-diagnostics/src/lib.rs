//! Startup verification of the HostBridge wiring.
//!
//! A [Verifier] runs independent checks, each producing [DiagnosticFinding]s. The checks for
//! the core live in [checks]; pipeline adapters ship their own next to the adapter.
//!
//! ```
//! use hostbridge_diagnostics::{checks, Verifier};
//!
//! let verifier = Verifier::new().add(checks::verify_core);
//! for finding in verifier.run() {
//!     println!("{finding}");
//! }
//! ```

pub mod checks;
mod errors;
mod finding;
mod verifier;

pub use errors::VerificationFailed;
pub use finding::{DiagnosticFinding, Severity};
pub use verifier::{CheckOutput, Verifier, CRASH_CODE};
