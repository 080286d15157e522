//! Command-line interface: the server entry point plus one-shot tool runs
//! and GPU diagnostics.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::bail;
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde_json::json;
use tokio::sync::RwLock;
use tracing::info;

use crate::adapters::http_api::AppContext;
use crate::agents::llm::{GenerateOptions, LlmClient, OllamaClient};
use crate::agents::{build_registry, AgentContext};
use crate::config::Settings;
use crate::monitor::GpuMonitor;

/// AI text-processing toolkit backed by a local Ollama runtime
#[derive(Parser, Debug)]
#[command(name = "lexis", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "LEXIS_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Ollama host override
    #[arg(long, env = "LEXIS_OLLAMA_HOST", global = true)]
    pub ollama_host: Option<String>,

    /// Ollama port override
    #[arg(long, env = "LEXIS_OLLAMA_PORT", global = true)]
    pub ollama_port: Option<u16>,

    /// Model override
    #[arg(long, env = "LEXIS_MODEL", global = true)]
    pub model: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API with the MCP service mounted at /mcp
    Serve {
        /// Bind address
        #[arg(long, env = "LEXIS_HOST")]
        host: Option<String>,
        /// Bind port
        #[arg(long, env = "LEXIS_PORT")]
        port: Option<u16>,
    },
    /// Check Ollama and API health
    Status,
    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Basic text statistics via the analyzer agent
    Analyze {
        /// Text to analyze
        text: Option<String>,
        /// Fetch the text from a URL instead
        #[arg(long, conflicts_with = "text")]
        url: Option<String>,
    },
    /// Clean up text with the default cleaning options
    Clean {
        /// Text to clean
        text: String,
    },
    /// Strip diacritics from text
    RemoveDiacritics {
        /// Text to process
        text: String,
    },
    /// Remove sensitive information from text
    Anonymize {
        /// Text to anonymize
        text: String,
        /// Anonymization level: basic, standard, aggressive or strict
        #[arg(long, default_value = "standard")]
        level: String,
        /// Use model-assisted anonymization instead of the rule patterns
        #[arg(long)]
        smart: bool,
    },
    /// List agents and their tools
    Agents,
    /// Show version information
    Version,
    /// GPU diagnostics
    #[command(subcommand)]
    Gpu(GpuCommand),
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Write a default configuration file
    Create {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the resolved configuration as YAML
    Show,
    /// Show where the configuration file lives
    Edit,
}

#[derive(Subcommand, Debug)]
pub enum GpuCommand {
    /// One-shot probe snapshot with recommendations
    Status,
    /// Periodic printed samples
    Monitor {
        /// Monitoring duration in seconds
        #[arg(long, default_value_t = 30)]
        duration: u64,
        /// Sampling interval in seconds
        #[arg(long, default_value_t = 2)]
        interval: u64,
    },
    /// Inference micro-benchmark through the live client
    Test {
        /// Number of test iterations
        #[arg(long, default_value_t = 5)]
        iterations: usize,
        /// Model to test with
        #[arg(long)]
        model: Option<String>,
    },
    /// Canned prompt set with per-prompt speeds
    Benchmark,
    /// Write the JSON performance report
    Report {
        /// Output file path
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

impl Cli {
    /// Load settings and apply the CLI/env overrides on top.
    pub fn load_settings(&self) -> anyhow::Result<Settings> {
        let mut settings = Settings::load(self.config.as_deref())?;
        if let Some(host) = &self.ollama_host {
            settings.ollama.host = host.clone();
        }
        if let Some(port) = self.ollama_port {
            settings.ollama.port = port;
        }
        if let Some(model) = &self.model {
            settings.ollama.model = model.clone();
        }
        Ok(settings)
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    // Version and config management work even when the config file is
    // broken, so they run before settings load.
    match &cli.command {
        Commands::Version => {
            println!("lexis {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Commands::Config(command) => return config_command(&cli, command),
        _ => {}
    }

    let settings = cli.load_settings()?;
    let level = if cli.verbose {
        "debug"
    } else {
        &settings.logging.level
    };
    crate::init_logging(level);

    match cli.command {
        Commands::Serve { host, port } => serve(settings, host, port).await,
        Commands::Status => status(settings).await,
        Commands::Analyze { text, url } => {
            let args = match (text, url) {
                (_, Some(url)) => json!({"url": url}),
                (Some(text), None) => json!({"text": text}),
                (None, None) => json!({}),
            };
            run_tool(settings, "analyze_text_basic", args).await
        }
        Commands::Clean { text } => run_tool(settings, "clean_text", json!({"text": text})).await,
        Commands::RemoveDiacritics { text } => {
            run_tool(settings, "remove_diacritics", json!({"text": text})).await
        }
        Commands::Anonymize { text, level, smart } => {
            if smart {
                run_tool(settings, "smart_anonymize", json!({"text": text})).await
            } else {
                run_tool(
                    settings,
                    "anonymize_text",
                    json!({"text": text, "anonymization_level": level}),
                )
                .await
            }
        }
        Commands::Agents => list_agents(settings),
        Commands::Gpu(command) => gpu_command(settings, command).await,
        Commands::Version | Commands::Config(_) => unreachable!("handled above"),
    }
}

/// Everything a running service needs, wired once.
fn build_context(settings: Settings) -> anyhow::Result<AppContext> {
    let monitor = Arc::new(GpuMonitor::new(settings.gpu.max_history));
    let client: Arc<dyn LlmClient> =
        Arc::new(OllamaClient::new(&settings)?.with_monitor(monitor.clone()));
    let settings = Arc::new(RwLock::new(settings));
    let registry = Arc::new(build_registry(AgentContext::new(
        settings.clone(),
        client.clone(),
    ))?);

    Ok(AppContext {
        settings,
        client,
        monitor,
        registry,
    })
}

async fn serve(mut settings: Settings, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    if let Some(host) = host {
        settings.server.host = host;
    }
    if let Some(port) = port {
        settings.server.port = port;
    }

    let host = settings.server.host.clone();
    let port = settings.server.port;
    let sample_interval = Duration::from_secs(settings.gpu.sample_interval_seconds.max(1));

    let context = build_context(settings)?;
    info!(
        "Starting lexis with {} agents and {} tools",
        context.registry.agent_count(),
        context.registry.tool_count()
    );
    context.monitor.start_monitoring(sample_interval).await;

    let app = crate::create_app(context).await;
    let addr = format!("{host}:{port}");
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn status(settings: Settings) -> anyhow::Result<()> {
    let ollama_url = settings.ollama.base_url();
    let api_url = format!(
        "http://{}:{}/health",
        settings.server.host, settings.server.port
    );
    let model = settings.ollama.model.clone();
    let client = OllamaClient::new(&settings)?;

    println!("{:<12} {:<13} {}", "Component", "Status", "Details");
    if client.health_check().await {
        let models = client.list_models().await.map(|m| m.len()).unwrap_or(0);
        println!(
            "{:<12} {:<13} {}",
            "Ollama",
            "connected",
            format!("{models} models at {ollama_url}")
        );
    } else {
        println!("{:<12} {:<13} {}", "Ollama", "unreachable", ollama_url);
    }

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()?;
    match http.get(&api_url).send().await {
        Ok(response) if response.status().is_success() => {
            println!(
                "{:<12} {:<13} {}",
                "API",
                "running",
                format!("{}:{}", settings.server.host, settings.server.port)
            );
        }
        Ok(response) => {
            println!(
                "{:<12} {:<13} {}",
                "API",
                "error",
                format!("status {}", response.status())
            );
        }
        Err(_) => {
            println!(
                "{:<12} {:<13} {}",
                "API", "not running", "start with: lexis serve"
            );
        }
    }
    println!(
        "{:<12} {:<13} {}",
        "Config",
        "loaded",
        format!("model: {model}")
    );
    Ok(())
}

fn config_command(cli: &Cli, command: &ConfigCommand) -> anyhow::Result<()> {
    match command {
        ConfigCommand::Create { force } => {
            let path = cli
                .config
                .clone()
                .unwrap_or_else(Settings::default_config_path);
            if path.exists() && !force {
                bail!(
                    "Config file already exists at {} (use --force to overwrite)",
                    path.display()
                );
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, Settings::default().to_yaml()?)?;
            println!("Created config file at {}", path.display());
            Ok(())
        }
        ConfigCommand::Show => {
            match Settings::locate_config_file(cli.config.as_deref()) {
                Some(path) => println!("# loaded from {}", path.display()),
                None => println!("# defaults (no config file found)"),
            }
            let settings = cli.load_settings()?;
            print!("{}", settings.to_yaml()?);
            Ok(())
        }
        ConfigCommand::Edit => {
            let path = Settings::locate_config_file(cli.config.as_deref())
                .unwrap_or_else(Settings::default_config_path);
            println!("Edit the configuration file at: {}", path.display());
            if !path.exists() {
                println!("It does not exist yet; run 'lexis config create' first.");
            }
            Ok(())
        }
    }
}

async fn run_tool(settings: Settings, name: &str, args: serde_json::Value) -> anyhow::Result<()> {
    let context = build_context(settings)?;
    let output = context.registry.dispatch(name, &args).await?;
    println!("{}", output.into_text());
    Ok(())
}

fn list_agents(settings: Settings) -> anyhow::Result<()> {
    let context = build_context(settings)?;
    let infos = context.registry.agent_infos();
    let total_tools = context.registry.tool_count();

    for info in &infos {
        println!("{} - {}", info.name, info.description);
        println!("  tools: {}", info.tools.join(", "));
    }
    println!();
    println!("Total: {} agents, {} tools", infos.len(), total_tools);
    Ok(())
}

async fn gpu_command(settings: Settings, command: GpuCommand) -> anyhow::Result<()> {
    match command {
        GpuCommand::Status => gpu_status(settings).await,
        GpuCommand::Monitor { duration, interval } => {
            gpu_monitor(settings, duration, interval).await
        }
        GpuCommand::Test { iterations, model } => gpu_test(settings, iterations, model).await,
        GpuCommand::Benchmark => gpu_benchmark(settings).await,
        GpuCommand::Report { output } => gpu_report(settings, output).await,
    }
}

async fn gpu_status(settings: Settings) -> anyhow::Result<()> {
    let monitor = GpuMonitor::new(settings.gpu.max_history);
    let health = monitor.check_health().await;
    let recommendations = monitor.get_optimization_recommendations().await;

    println!("{:<22} {}", "GPU available", yes_no(health.gpu_available));
    if let Some(name) = &health.gpu_name {
        println!("{:<22} {}", "GPU name", name);
        println!("{:<22} {}%", "GPU utilization", health.gpu_utilization);
    }
    if let Some(memory) = &health.gpu_memory {
        println!("{:<22} {}", "GPU memory", memory);
    }
    if let Some(temperature) = health.gpu_temperature {
        println!("{:<22} {}C", "GPU temperature", temperature);
    }
    println!(
        "{:<22} {}",
        "Ollama accelerated",
        yes_no(health.ollama_gpu_accelerated)
    );
    if let Some(model) = &health.ollama_model {
        println!("{:<22} {}", "Active model", model);
    }
    if let Some(memory) = &health.ollama_memory {
        println!("{:<22} {}", "Ollama memory", memory);
    }

    if !recommendations.is_empty() {
        println!();
        println!("Recommendations:");
        for (i, recommendation) in recommendations.iter().enumerate() {
            println!("{}. {}", i + 1, recommendation);
        }
    }
    Ok(())
}

async fn gpu_monitor(settings: Settings, duration: u64, interval: u64) -> anyhow::Result<()> {
    let monitor = GpuMonitor::new(settings.gpu.max_history);
    let deadline = Instant::now() + Duration::from_secs(duration);

    println!("Monitoring GPU for {duration}s (Ctrl+C to stop early)");
    let mut ticker = tokio::time::interval(Duration::from_secs(interval.max(1)));
    while Instant::now() < deadline {
        ticker.tick().await;
        let sample = monitor.update_metrics().await;
        println!(
            "{}  util {:>5.1}%  mem {:>5.1}%  temp {:>5.1}C  ollama {} MB  cpu {:>5.1}%",
            sample.timestamp.format("%H:%M:%S"),
            sample.gpu_utilization,
            sample.gpu_memory_percent,
            sample.gpu_temperature,
            sample.ollama_memory_mb,
            sample.cpu_usage
        );
    }

    let summary = monitor.get_performance_summary().await;
    println!();
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

const TEST_PROMPTS: &[&str] = &[
    "What is artificial intelligence?",
    "Explain machine learning in simple terms.",
    "Write a short story about a robot.",
    "Describe the benefits of GPU acceleration.",
    "What are the applications of natural language processing?",
];

async fn gpu_test(
    settings: Settings,
    iterations: usize,
    model: Option<String>,
) -> anyhow::Result<()> {
    let monitor = Arc::new(GpuMonitor::new(settings.gpu.max_history));
    let client = OllamaClient::new(&settings)?.with_monitor(monitor.clone());
    let model = model.unwrap_or_else(|| settings.ollama.model.clone());
    client.ensure_model_available(Some(&model)).await;

    println!("Running {iterations} iterations against {model}");
    println!(
        "{:<6} {:>12} {:>10} {:>12}",
        "Test", "Duration (s)", "Tokens", "Speed (t/s)"
    );

    let mut total_tokens = 0u64;
    let mut total_duration = 0.0f64;
    for i in 0..iterations {
        let prompt = TEST_PROMPTS[i % TEST_PROMPTS.len()];
        let options = GenerateOptions {
            model: Some(model.clone()),
            system: Some("Be concise and informative.".to_string()),
            ..Default::default()
        };

        let started = Instant::now();
        let result = client.generate(prompt, &options).await?;
        let duration = started.elapsed().as_secs_f64();

        let tokens = u64::from(result.eval_count.unwrap_or(0));
        let speed = result.tokens_per_second().unwrap_or_else(|| {
            if duration > 0.0 {
                tokens as f64 / duration
            } else {
                0.0
            }
        });
        println!("{:<6} {:>12.2} {:>10} {:>12.1}", i + 1, duration, tokens, speed);

        total_tokens += tokens;
        total_duration += duration;
    }

    let average_duration = total_duration / iterations.max(1) as f64;
    let average_speed = if total_duration > 0.0 {
        total_tokens as f64 / total_duration
    } else {
        0.0
    };
    println!();
    println!("Average duration: {average_duration:.2}s");
    println!("Average speed: {average_speed:.1} tokens/second");
    println!("Total tokens: {total_tokens}");
    Ok(())
}

const BENCHMARK_PROMPTS: &[(&str, &str)] = &[
    ("short", "What is artificial intelligence?"),
    (
        "explain",
        "Explain how neural networks learn, covering their structure and training process.",
    ),
    ("creative", "Write a short story about a robot discovering music."),
    (
        "technical",
        "Describe the benefits of GPU acceleration for large language models.",
    ),
];

async fn gpu_benchmark(settings: Settings) -> anyhow::Result<()> {
    let model = settings.ollama.model.clone();
    let client = OllamaClient::new(&settings)?;
    client.ensure_model_available(None).await;

    // Warm-up call so the first timed prompt is not paying model load time.
    let _ = client.generate("Hello", &Default::default()).await;

    println!("Benchmarking {model}");
    println!(
        "{:<10} {:>12} {:>10} {:>12}",
        "Prompt", "Duration (s)", "Tokens", "Speed (t/s)"
    );

    let mut best: Option<(&str, f64)> = None;
    for (label, prompt) in BENCHMARK_PROMPTS {
        let started = Instant::now();
        match client.generate(prompt, &Default::default()).await {
            Ok(result) => {
                let duration = started.elapsed().as_secs_f64();
                let tokens = u64::from(result.eval_count.unwrap_or(0));
                let speed = result.tokens_per_second().unwrap_or_else(|| {
                    if duration > 0.0 {
                        tokens as f64 / duration
                    } else {
                        0.0
                    }
                });
                println!("{label:<10} {duration:>12.2} {tokens:>10} {speed:>12.1}");
                if best.map_or(true, |(_, fastest)| speed > fastest) {
                    best = Some((label, speed));
                }
            }
            Err(err) => println!("{label:<10} failed: {err}"),
        }
    }

    if let Some((label, speed)) = best {
        println!();
        println!("Fastest prompt: {label} at {speed:.1} tokens/second");
    }
    Ok(())
}

async fn gpu_report(settings: Settings, output: Option<PathBuf>) -> anyhow::Result<()> {
    let monitor = GpuMonitor::new(settings.gpu.max_history);
    monitor.update_metrics().await;

    let path = output
        .unwrap_or_else(|| PathBuf::from(format!("gpu_report_{}.json", Utc::now().timestamp())));
    monitor.save_performance_report(&path).await?;
    println!("Report saved to {}", path.display());

    let health = monitor.check_health().await;
    let recommendations = monitor.get_optimization_recommendations().await;
    println!();
    println!("GPU available: {}", yes_no(health.gpu_available));
    if let Some(name) = &health.gpu_name {
        println!("GPU name: {name}");
        println!("GPU utilization: {}%", health.gpu_utilization);
    }
    println!("Recommendations: {}", recommendations.len());
    for (i, recommendation) in recommendations.iter().take(3).enumerate() {
        println!("{}. {}", i + 1, recommendation);
    }
    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
