use clap::Parser;
use dialoguer::Confirm;
use medi_scan::capture::{CapturedImage, CommandCamera, CommandStream, ImageOptions, StreamRequest};
use medi_scan::identifier::GeminiClient;
use medi_scan::runner::{run_analysis, RunOutcome};
use medi_scan::session::{Completion, Session};
use medi_scan::{cli, config, error, interactive, present};
use cli::{Cli, Commands};
use config::Config;
use error::{MediScanError, Result};
use std::io::Read;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "失敗");
            eprintln!("✖ {}", e.user_message());
            if e.is_config_problem() {
                eprintln!("  {}", e);
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = Config::load()?;

    match cli.command {
        Commands::Identify { image, json } => {
            let client = GeminiClient::from_config(&config)?;
            let mut session: Session<CommandStream> = Session::new();
            let options = ImageOptions::upload(&config);

            if Commands::reads_stdin(&image) {
                let mut data_url = String::new();
                std::io::stdin()
                    .read_to_string(&mut data_url)
                    .map_err(|e| MediScanError::FileRead(format!("標準入力: {}", e)))?;
                session.load_image(CapturedImage::from_data_url(&data_url, &options)?)?;
            } else {
                session.load_file(&image, &options)?;
            }

            if !json {
                println!("💊 MediScan AI - 약품 분석\n");
                println!("[1/2] 사진을 불러왔습니다: {}", image.display());
                println!("[2/2] 분석 중... (모델: {})", client.model());
            }
            finish(&mut session, &client, json).await
        }

        Commands::Capture { json } => {
            let client = GeminiClient::from_config(&config)?;
            let camera = CommandCamera::new(config.camera.clone());
            let mut session: Session<CommandStream> = Session::new();

            session.open_camera(&camera, &StreamRequest::from_config(&config.camera))?;
            println!("📷 카메라가 준비되었습니다. 약품이 잘 보이도록 맞춰주세요.");

            let shoot = Confirm::new()
                .with_prompt("촬영하시겠습니까?")
                .default(true)
                .interact()
                .map_err(|e| MediScanError::CliExecution(e.to_string()))?;
            if !shoot {
                session.cancel_capture()?;
                println!("촬영을 취소했습니다.");
                return Ok(ExitCode::SUCCESS);
            }

            session.capture(&ImageOptions::camera(&config))?;
            if !json {
                println!("✔ 촬영 완료. 분석 중... (모델: {})", client.model());
            }
            finish(&mut session, &client, json).await
        }

        Commands::Session => {
            let client = GeminiClient::from_config(&config)?;
            let camera = CommandCamera::new(config.camera.clone());
            interactive::run_interactive(&config, &camera, &client).await?;
            Ok(ExitCode::SUCCESS)
        }

        Commands::Config { set_api_key, show } => {
            let mut config = config;

            if let Some(key) = set_api_key {
                config.set_api_key(key)?;
                println!("✔ APIキーを設定しました");
            }

            if show {
                println!("設定: {}", Config::config_path()?.display());
                println!("  モデル: {}", config.model);
                println!("  APIベース: {}", config.api_base);
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!("  JPEG品質: {}", config.jpeg_quality());
                println!("  最大画像サイズ: {}px", config.max_image_size);
                println!(
                    "  カメラ: {} ({}, {}x{}, {})",
                    config.camera.program,
                    config.camera.device.display(),
                    config.camera.width,
                    config.camera.height,
                    config.camera.facing
                );
                println!("  APIキー: {}", if config.get_api_key().is_ok() { "設定済み" } else { "未設定" });
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// 解析して結果を出力
async fn finish(session: &mut Session<CommandStream>, client: &GeminiClient, json: bool) -> Result<ExitCode> {
    match run_analysis(session, client).await {
        RunOutcome::Finished(Completion::Succeeded) => {
            if let Some(identification) = session.identification() {
                if json {
                    println!("{}", present::render_json(identification)?);
                } else {
                    println!("\n{}", present::render_text(identification));
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        RunOutcome::Cancelled => {
            eprintln!("분석을 취소했습니다.");
            Ok(ExitCode::from(130))
        }
        RunOutcome::Finished(_) | RunOutcome::NotStarted => {
            if let Some(message) = session.error() {
                eprintln!("✖ {}", message);
            }
            Ok(ExitCode::FAILURE)
        }
    }
}
