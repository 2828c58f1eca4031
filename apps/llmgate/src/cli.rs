use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "llmgate")]
pub(crate) struct Cli {
    #[arg(long, env = "LLMGATE_HOST", default_value = "127.0.0.1")]
    pub(crate) host: String,
    #[arg(long, env = "LLMGATE_PORT", default_value_t = 8787)]
    pub(crate) port: u16,
    #[arg(long, env = "LLMGATE_PROXY")]
    pub(crate) proxy: Option<String>,
    /// Redis URL for the shared concurrency counter store. Falls back to an
    /// in-process store (correct for a single node, not for a fleet) when
    /// unset.
    #[arg(long, env = "LLMGATE_REDIS_URL")]
    pub(crate) redis_url: Option<String>,
    #[arg(long, env = "LLMGATE_MAX_ACCOUNT_SWITCHES", default_value_t = 3)]
    pub(crate) max_account_switches: u32,
    #[arg(long, env = "LLMGATE_USAGE_WORKERS", default_value_t = 2)]
    pub(crate) usage_workers: usize,
}
