//! 브로커 연결 관리자 CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # Dhan 자격증명 등록 (30일 로그인 유지)
//! broker register dhan --client-id 1100012345 --access-token <TOKEN> --remember
//!
//! # 연결 및 상태 확인
//! broker connect dhan -u 1100012345
//! broker status dhan -u 1100012345
//!
//! # 주문 내역 조회 (JSON 출력)
//! broker --json fetch orders dhan -u 1100012345
//!
//! # dhan_token.json 가져오기 (DHAN_CLIENT_ID 환경 변수 사용)
//! broker import-token --file dhan_token.json
//! ```

use anyhow::{anyhow, Context, Result};
use broker_cli::commands::output::{render_health, render_outcome, render_status, OutputFormat};
use broker_cli::commands::register::RegisterArgs;
use broker_core::{init_logging, init_logging_from_env, AppConfig, BrokerKind, FetchKind, LogConfig};
use broker_service::ConnectionManager;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser)]
#[command(name = "broker")]
#[command(about = "Broker connection manager - Kite / Dhan / Angel One 계정 연결 관리", long_about = None)]
#[command(version)]
struct Cli {
    /// 설정 파일 (없으면 기본값과 환경 변수 사용, 로깅은 `RUST_LOG`/`LOG_FORMAT`)
    #[arg(short, long, global = true, default_value = "config/default.toml")]
    config: PathBuf,

    /// JSON 형식으로 출력
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 브로커 자격증명 등록 (민감 필드는 암호화 저장)
    Register {
        /// 브로커 (kite, dhan, angel)
        broker: BrokerKind,

        /// 거래 계정 사용자 ID (Dhan은 생략 시 Client ID 사용)
        #[arg(short, long, default_value = "")]
        user_id: String,

        /// API Key (Kite, Angel)
        #[arg(long, env = "BROKER_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// API Secret (Kite, Angel)
        #[arg(long, env = "BROKER_API_SECRET", hide_env_values = true)]
        api_secret: Option<String>,

        /// Client ID (Dhan)
        #[arg(long)]
        client_id: Option<String>,

        /// Access Token (Dhan)
        #[arg(long, env = "BROKER_ACCESS_TOKEN", hide_env_values = true)]
        access_token: Option<String>,

        /// 로그인 유지 (30일 세션)
        #[arg(long)]
        remember: bool,
    },

    /// 브로커 연결 (Kite는 로그인 URL 출력)
    Connect {
        /// 브로커 (kite, dhan, angel)
        broker: BrokerKind,

        /// 사용자 ID
        #[arg(short, long)]
        user_id: String,
    },

    /// 연결 상태 확인 (활성 세션을 브로커에 실시간 검증)
    Status {
        /// 브로커 (kite, dhan, angel)
        broker: BrokerKind,

        /// 사용자 ID
        #[arg(short, long)]
        user_id: String,
    },

    /// 연결 해제
    Disconnect {
        /// 브로커 (kite, dhan, angel). `--all`이면 생략 가능
        broker: Option<BrokerKind>,

        /// 사용자 ID
        #[arg(short, long, default_value = "")]
        user_id: String,

        /// 모든 자격증명과 세션 삭제
        #[arg(long)]
        all: bool,
    },

    /// 주문/포지션/체결 내역 조회
    Fetch {
        /// 조회 종류 (orders, positions, trades)
        kind: FetchKind,

        /// 브로커 (kite, dhan, angel)
        broker: BrokerKind,

        /// 사용자 ID
        #[arg(short, long)]
        user_id: String,
    },

    /// 저장된 계정 목록
    Accounts,

    /// 만료 세션 정리 및 현황 보고
    Init,

    /// 저장소 상태 점검
    Health,

    /// dhan_token.json 형식의 Dhan 토큰 가져오기
    ImportToken {
        /// 토큰 파일 경로
        #[arg(short, long, default_value = "dhan_token.json")]
        file: PathBuf,

        /// Dhan Client ID
        #[arg(long, env = "DHAN_CLIENT_ID", default_value = "")]
        client_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    let logging = if cli.config.exists() {
        init_logging(LogConfig::from(&config.logging))
    } else {
        init_logging_from_env()
    };
    logging.map_err(|e| anyhow!("Failed to initialize logging: {e}"))?;
    debug!(config = %cli.config.display(), "Configuration loaded");

    let manager = ConnectionManager::open(&config)
        .await
        .context("Failed to open broker storage")?;
    let format = OutputFormat::new(cli.json);

    let ok = match cli.command {
        Commands::Register {
            broker,
            user_id,
            api_key,
            api_secret,
            client_id,
            access_token,
            remember,
        } => {
            let fields = RegisterArgs {
                api_key,
                api_secret,
                client_id,
                access_token,
                remember,
            }
            .into_fields();
            let outcome = manager.register(broker, &user_id, fields).await;
            println!("{}", render_outcome(&outcome, format));
            outcome.ok
        }

        Commands::Connect { broker, user_id } => {
            let outcome = manager.connect(broker, &user_id).await;
            println!("{}", render_outcome(&outcome, format));
            outcome.ok
        }

        Commands::Status { broker, user_id } => {
            let report = manager.status(broker, &user_id).await;
            println!("{}", render_status(&report, format));
            report.connected
        }

        Commands::Disconnect {
            broker,
            user_id,
            all,
        } => {
            let outcome = match (broker, all) {
                (_, true) => manager.disconnect_all().await,
                (Some(broker), false) => manager.disconnect(broker, &user_id, false).await,
                (None, false) => {
                    return Err(anyhow!("Specify a broker or pass --all to clear everything"))
                }
            };
            println!("{}", render_outcome(&outcome, format));
            outcome.ok
        }

        Commands::Fetch {
            kind,
            broker,
            user_id,
        } => {
            let outcome = manager.fetch(kind, broker, &user_id).await;
            println!("{}", render_outcome(&outcome, format));
            outcome.ok
        }

        Commands::Accounts => {
            let outcome = manager.list_accounts().await;
            println!("{}", render_outcome(&outcome, format));
            outcome.ok
        }

        Commands::Init => {
            let outcome = manager.initialize().await;
            println!("{}", render_outcome(&outcome, format));
            outcome.ok
        }

        Commands::Health => {
            let report = manager.health().await;
            println!("{}", render_health(&report, format));
            true
        }

        Commands::ImportToken { file, client_id } => {
            let outcome = manager.import_token_file(&file, &client_id).await;
            println!("{}", render_outcome(&outcome, format));
            outcome.ok
        }
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
