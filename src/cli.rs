use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "medi-scan")]
#[command(about = "약품 사진 AI 식별 도구 (Gemini + Google 검색)", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 画像ファイルから薬品を識別
    Identify {
        /// 画像ファイルのパス（`-` で標準入力からData URLを読む）
        #[arg(required = true)]
        image: PathBuf,

        /// 結果をJSONで出力
        #[arg(long)]
        json: bool,
    },

    /// カメラで撮影して識別
    Capture {
        /// 結果をJSONで出力
        #[arg(long)]
        json: bool,
    },

    /// 対話モード（撮影→確認→解析→結果→リセット）
    Session,

    /// 設定を表示/編集
    Config {
        /// APIキーを設定
        #[arg(long)]
        set_api_key: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

impl Commands {
    /// 標準入力からData URLを読むか
    pub fn reads_stdin(image: &std::path::Path) -> bool {
        image.as_os_str() == "-"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_identify() {
        let cli = Cli::try_parse_from(["medi-scan", "identify", "pill.jpg", "--json", "-v"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Identify { image, json } => {
                assert_eq!(image, PathBuf::from("pill.jpg"));
                assert!(json);
                assert!(!Commands::reads_stdin(&image));
            }
            _ => panic!("Expected Identify"),
        }
    }

    #[test]
    fn test_parse_identify_stdin() {
        let cli = Cli::try_parse_from(["medi-scan", "identify", "-"]).unwrap();
        match cli.command {
            Commands::Identify { image, .. } => assert!(Commands::reads_stdin(&image)),
            _ => panic!("Expected Identify"),
        }
    }
}
