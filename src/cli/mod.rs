use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "bioos-mcp-gateway")]
#[command(about = "Bio-OS MCP Gateway - Admin CLI")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Health check the service
    Health {
        /// Service URL to check
        #[arg(short, long, default_value = "http://localhost:8080")]
        url: String,
    },
    /// Validate configuration
    Config {
        /// Validate config without starting service
        #[arg(long)]
        validate: bool,
    },
    /// Show service status and configuration summary
    Status {
        /// Service URL to check
        #[arg(short, long, default_value = "http://localhost:8080")]
        url: String,
    },
    /// Check that the womtool binary is reachable
    TestWomtool {
        /// Binary to probe instead of $WOMTOOL_BIN
        #[arg(short, long)]
        bin: Option<String>,
    },
}

pub async fn run() -> ExitCode {
    let cli = Cli::parse();

    run_commands(cli.command).await
}

pub async fn run_commands(command: Commands) -> ExitCode {
    match command {
        Commands::Health { url } => match health_check(&url).await {
            Ok(_) => {
                println!("✅ Service is healthy");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("❌ Health check failed: {}", e);
                ExitCode::FAILURE
            }
        },
        Commands::Config { validate: _ } => match validate_config() {
            Ok(_) => {
                println!("✅ Configuration is valid");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("❌ Configuration validation failed: {}", e);
                ExitCode::FAILURE
            }
        },
        Commands::Status { url } => match show_status(&url).await {
            Ok(_) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("❌ Status check failed: {}", e);
                ExitCode::FAILURE
            }
        },
        Commands::TestWomtool { bin } => match test_womtool(bin).await {
            Ok(version) => {
                println!("✅ womtool reachable: {}", version);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("❌ womtool test failed: {}", e);
                ExitCode::FAILURE
            }
        },
    }
}

async fn health_check(url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/healthz", url))
        .timeout(std::time::Duration::from_millis(500))
        .send()
        .await?;

    if response.status().is_success() {
        Ok(())
    } else {
        Err(format!("HTTP {}", response.status()).into())
    }
}

fn validate_config() -> Result<(), Box<dyn std::error::Error>> {
    let config = crate::infra::config::Config::from_env();
    config.validate()?;
    Ok(())
}

async fn show_status(url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let client = reqwest::Client::new();

    // Health check
    let health_response = client
        .get(format!("{}/healthz", url))
        .timeout(std::time::Duration::from_secs(5))
        .send()
        .await?;

    println!(
        "🏥 Health Status: {}",
        if health_response.status().is_success() {
            "✅ Healthy"
        } else {
            "❌ Unhealthy"
        }
    );

    // Try to get tools list
    let tools_response = client
        .post(format!("{}/mcp", url))
        .header("content-type", "application/json")
        .json(&serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/list",
            "params": {}
        }))
        .timeout(std::time::Duration::from_millis(500))
        .send()
        .await;

    match tools_response {
        Ok(resp) if resp.status().is_success() => {
            println!("🔧 Tools: ✅ Available");
        }
        Ok(resp) => {
            println!("🔧 Tools: ❌ HTTP {}", resp.status());
        }
        Err(_) => {
            println!("🔧 Tools: ❌ Unavailable");
        }
    }

    // Configuration summary
    println!("\n📋 Configuration:");
    println!(
        "  Mode: {}",
        std::env::var("MODE").unwrap_or_else(|_| "server".into())
    );
    println!(
        "  Port: {}",
        std::env::var("PORT").unwrap_or_else(|_| "8080".into())
    );
    println!(
        "  Log Level: {}",
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into())
    );
    println!(
        "  Bio-OS Endpoint: {}",
        std::env::var("BIOOS_ENDPOINT")
            .unwrap_or_else(|_| crate::infra::config::DEFAULT_ENDPOINT.into())
    );
    println!(
        "  Dockstore: {}",
        std::env::var("DOCKSTORE_BASE_URL")
            .unwrap_or_else(|_| crate::infra::config::DEFAULT_DOCKSTORE_BASE.into())
    );

    if let Ok(builder_url) = std::env::var("IMAGE_BUILDER_BASE_URL") {
        println!("  Image Builder: {}", builder_url);
    } else {
        println!("  Image Builder: Not configured");
    }
    if let Ok(rerank_url) = std::env::var("RERANK_BASE_URL") {
        println!("  Reranker: {}", rerank_url);
    } else {
        println!("  Reranker: Not configured");
    }

    Ok(())
}

async fn test_womtool(bin: Option<String>) -> Result<String, Box<dyn std::error::Error>> {
    let bin = bin
        .or_else(|| std::env::var("WOMTOOL_BIN").ok())
        .unwrap_or_else(|| "womtool".into());
    let tool = crate::exec::womtool::Womtool::new(bin);
    let out = tool.version().await?;
    if !out.success {
        return Err(format!("womtool exited with {}", out.status).into());
    }
    Ok(out.combined())
}
