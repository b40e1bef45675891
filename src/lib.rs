// ============================================================================
// [总线] 程序的组装车间
// ✅ 只能做：pub mod 暴露子模块、解析命令行、初始化日志与配置、组装控制器
// ⛔ 禁止：直接实现业务逻辑
// ============================================================================

pub mod commands;
pub mod models;
pub mod services;
pub mod utils;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::services::file_delivery::{DownloadDirTarget, FileDeliveryHandler};
use crate::services::nutrition_client::NutritionClient;
use crate::services::workflow::WorkflowController;
use crate::utils::config::AppConfig;

/// 默认日志过滤规则，`RUST_LOG` 优先
const DEFAULT_LOG_FILTER: &str = "recipe_label_console_lib=info,recipe_label_console=info";

#[derive(Parser, Debug)]
#[command(
    name = "recipe-label-console",
    version,
    about = "Calculate recipe nutrition, review compliance and download the nutrition label"
)]
struct Cli {
    /// Recipe draft JSON file
    draft: PathBuf,

    /// Also generate the label document and save it to the download directory
    #[arg(long)]
    label: bool,

    /// Probe the nutrition service before submitting
    #[arg(long)]
    health: bool,
}

/// 根据配置组装工作流控制器
pub fn build_controller(config: &AppConfig) -> WorkflowController<NutritionClient> {
    let delivery = FileDeliveryHandler::new(
        config.staging_dir.clone(),
        Box::new(DownloadDirTarget::new(config.download_dir.clone())),
    );
    WorkflowController::new(NutritionClient::new(config), delivery)
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    // 日志输出到 stderr，stdout 只留给快照 JSON
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

// ============================================================================
// 应用入口
// ============================================================================

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: cannot start async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(execute(cli)) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(message) => {
            eprintln!("error: {}", message);
            ExitCode::FAILURE
        }
    }
}

/// 执行一次命令行会话；返回值表示所有操作是否成功
async fn execute(cli: Cli) -> Result<bool, String> {
    let config = AppConfig::from_env()?;
    log::info!("营养计算服务地址: {}", config.api_base_url);

    let controller = build_controller(&config);
    commands::recipe::import_draft(&controller, &cli.draft)?;

    if cli.health {
        commands::dashboard::check_service(&controller).await?;
        log::info!("营养计算服务可用");
    }

    let mut succeeded = true;
    if cli.label {
        let (calculated, labelled) = tokio::join!(
            commands::dashboard::calculate_nutrition(&controller),
            commands::dashboard::download_label(&controller)
        );
        if let Err(e) = calculated {
            log::error!("营养计算失败: {}", e);
            succeeded = false;
        }
        match labelled {
            Ok(receipt) => log::info!("标签已保存到 {}", receipt.path.display()),
            Err(e) => {
                log::error!("标签生成失败: {}", e);
                succeeded = false;
            }
        }
    } else if let Err(e) = commands::dashboard::calculate_nutrition(&controller).await {
        log::error!("营养计算失败: {}", e);
        succeeded = false;
    }

    let snapshot = commands::dashboard::workflow_snapshot(&controller);
    let json = serde_json::to_string_pretty(&snapshot)
        .map_err(|e| format!("cannot serialize snapshot: {}", e))?;
    println!("{}", json);
    Ok(succeeded)
}
