//! eva-mcp -- standalone Model Context Protocol server over stdio.
//!
//! Takes no flags or subcommands; configuration is environment-only
//! (`EVA_MCP_WORKSPACE`, `EVA_MCP_MAX_LIST`).

fn main() -> anyhow::Result<()> {
    // Tracing goes to stderr so it never interleaves with the framed
    // protocol stream on stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = eva_mcp::McpServerConfig::default();
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();

    eva_mcp::run_mcp_server(config, stdin.lock(), stdout.lock())?;
    Ok(())
}
