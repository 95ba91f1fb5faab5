pub mod config;
pub mod history;
pub mod plan;
pub mod session;

use breathwork_core::session::format_elapsed;
use breathwork_core::RoundDuration;

/// Human-readable round length.
pub(crate) fn describe_duration(duration: RoundDuration) -> String {
    match duration {
        RoundDuration::Fixed(ms) => format_elapsed(ms),
        RoundDuration::Open => "open".to_string(),
    }
}
