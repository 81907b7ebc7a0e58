//! Argument list for one assistant turn.

use relay_core::TurnOptions;

/// Flags that are always present: prompt mode and the line-delimited JSON stream.
const BASE_ARGS: [&str; 4] = ["-p", "--output-format", "stream-json", "--verbose"];

/// Builds the CLI arguments (without the program name) for one turn.
///
/// A session that is already established, or that the caller asks to resume,
/// is passed with `--resume`; otherwise `--session-id` creates it.
pub fn build_invocation(session_id: &str, established: bool, options: &TurnOptions) -> Vec<String> {
    let mut args: Vec<String> = BASE_ARGS.iter().map(|arg| arg.to_string()).collect();
    args.push("--model".to_string());
    args.push(options.model.clone());

    if options.resume || established {
        args.push("--resume".to_string());
    } else {
        args.push("--session-id".to_string());
    }
    args.push(session_id.to_string());

    if let Some(mode) = options.permission_mode {
        args.push("--permission-mode".to_string());
        args.push(mode.as_str().to_string());
    }
    if let Some(budget) = &options.max_budget_usd {
        args.push("--max-budget-usd".to_string());
        args.push(budget.clone());
    }
    if let Some(tools) = &options.allowed_tools {
        args.push("--allowedTools".to_string());
        args.push(tools.clone());
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::PermissionMode;

    fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|arg| arg == flag)
            .and_then(|index| args.get(index + 1))
            .map(String::as_str)
    }

    #[test]
    fn test_new_session_uses_session_id_flag() {
        let args = build_invocation("s-1", false, &TurnOptions::new("sonnet"));
        assert_eq!(
            args,
            vec![
                "-p",
                "--output-format",
                "stream-json",
                "--verbose",
                "--model",
                "sonnet",
                "--session-id",
                "s-1"
            ]
        );
    }

    #[test]
    fn test_established_session_resumes() {
        let args = build_invocation("s-1", true, &TurnOptions::new("sonnet"));
        assert_eq!(flag_value(&args, "--resume"), Some("s-1"));
        assert!(!args.iter().any(|arg| arg == "--session-id"));
    }

    #[test]
    fn test_resume_override_without_established_flag() {
        let options = TurnOptions::new("sonnet").with_resume(true);
        let args = build_invocation("s-2", false, &options);
        assert_eq!(flag_value(&args, "--resume"), Some("s-2"));
    }

    #[test]
    fn test_optional_flags_in_order() {
        let options = TurnOptions {
            max_budget_usd: Some("2.50".to_string()),
            allowed_tools: Some("Read,Grep".to_string()),
            ..TurnOptions::new("opus").with_permission_mode(PermissionMode::BypassPermissions)
        };
        let args = build_invocation("s-3", false, &options);

        assert_eq!(
            &args[8..],
            &[
                "--permission-mode",
                "bypassPermissions",
                "--max-budget-usd",
                "2.50",
                "--allowedTools",
                "Read,Grep"
            ]
        );
    }

    #[test]
    fn test_optional_flags_absent_by_default() {
        let args = build_invocation("s-4", false, &TurnOptions::new("sonnet"));
        for flag in ["--permission-mode", "--max-budget-usd", "--allowedTools"] {
            assert!(flag_value(&args, flag).is_none(), "unexpected {flag}");
        }
    }
}
