use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "flowtop",
    version,
    about = "A top-like dashboard for Kubernetes Jobs, Argo Workflows and Argo Events."
)]
pub struct CliArgs {
    /// Watch a single namespace (empty means all namespaces)
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Watch every namespace
    #[arg(short = 'A', long)]
    pub all_namespaces: bool,

    /// kubeconfig context to use instead of the current one
    #[arg(long)]
    pub context: Option<String>,

    /// Seconds between polls [default: 5]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub refresh_secs: Option<u64>,

    /// Seconds before a poll is abandoned [default: 10]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: Option<u64>,

    /// Show times in UTC
    #[arg(long, conflicts_with = "local")]
    pub utc: bool,

    /// Show times in the local timezone
    #[arg(long)]
    pub local: bool,

    /// tracing filter (for example: info,debug,trace)
    #[arg(long, default_value = "info")]
    pub log_filter: String,

    /// Append logs to this file instead of discarding them
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::CliArgs;
    use clap::Parser;

    #[test]
    fn defaults_leave_overrides_unset() {
        let args = CliArgs::try_parse_from(["flowtop"]).expect("parse");
        assert_eq!(args.namespace, None);
        assert!(!args.all_namespaces);
        assert_eq!(args.refresh_secs, None);
        assert_eq!(args.log_filter, "info");
    }

    #[test]
    fn short_flags_select_namespace_scope() {
        let args = CliArgs::try_parse_from(["flowtop", "-n", "ops", "-A"]).expect("parse");
        assert_eq!(args.namespace.as_deref(), Some("ops"));
        assert!(args.all_namespaces);
    }

    #[test]
    fn zero_refresh_interval_is_rejected() {
        assert!(CliArgs::try_parse_from(["flowtop", "--refresh-secs", "0"]).is_err());
    }

    #[test]
    fn utc_and_local_conflict() {
        assert!(CliArgs::try_parse_from(["flowtop", "--utc", "--local"]).is_err());
    }
}
