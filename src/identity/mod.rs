//! Identity subsystem: signed token issuance/validation and the auth gate
//! middleware that enforces identity on protected routes.
//! Keep the public surface thin and split implementation across sub-modules.

mod gate;
mod token;

pub use gate::{extract_token, require_auth};
pub use token::{issue_token, validate_token, Claims, TOKEN_TTL_SECS};
