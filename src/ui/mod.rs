//! Terminal output helpers
//!
//! Interactive terminals get `cliclack` log lines, prompts and an `indicatif`
//! spinner; CI and piped output fall back to plain bracketed prefixes.

mod context;
mod output;
mod progress;
mod prompts;

pub use context::UiContext;
pub use output::{
    intro, key_value, key_value_status, outro_success, remark,
    step_error_detail, step_info, step_ok, step_ok_detail, step_warn, step_warn_hint,
};
pub use progress::TaskSpinner;
pub use prompts::confirm;
