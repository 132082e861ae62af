//! Prompt Text
//!
//! The agent's standing instructions and the per-step preamble. Prompt text
//! lives here and nowhere else.

/// Standing instructions sent as the first system message of every request.
pub const SYSTEM_PROMPT: &str = "\
You are automind, a task-oriented assistant that solves the user's goal by \
reasoning step by step and calling tools when they help. You have a limited \
number of steps; be economical. When the task is done, or when you cannot \
make further progress, call the `terminate` tool. Put your final answer in \
your message text before terminating.";

/// Nudge appended after the history on every request.
pub const NEXT_STEP_PROMPT: &str = "\
Decide your next move. Either call one or more tools, or if the task is \
complete, state your final answer and call `terminate`.";

/// Fraction of the step budget after which the preamble warns the model to
/// wrap up.
const WARN_THRESHOLD: f64 = 0.8;

/// Per-step preamble carrying the step counter. Near the end of the budget
/// it tells the model to finish now.
pub fn build_step_info(current: u32, max: u32) -> String {
    let mut info = format!("Step {} of {}.", current, max);
    if f64::from(current) >= WARN_THRESHOLD * f64::from(max) {
        info.push_str(
            " You are almost out of steps. Finish the task now: give your \
             final answer and call `terminate`.",
        );
    }
    info
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_info_plain_early() {
        let info = build_step_info(1, 10);
        assert!(info.contains("Step 1 of 10"));
        assert!(!info.contains("almost out of steps"));
    }

    #[test]
    fn test_step_info_warns_at_threshold() {
        // 8 >= 0.8 * 10
        let info = build_step_info(8, 10);
        assert!(info.contains("almost out of steps"));
    }

    #[test]
    fn test_step_info_no_warning_just_below_threshold() {
        let info = build_step_info(7, 10);
        assert!(!info.contains("almost out of steps"));
    }

    #[test]
    fn test_step_info_warns_on_final_step() {
        let info = build_step_info(3, 3);
        assert!(info.contains("almost out of steps"));
    }
}
