//! BidanMandiri 服务器主程序

use anyhow::Context;
use bidan_admin::{init_logging, load_config, ConfigValidator, StorageBackend};
use bidan_database::{DatabasePool, DocumentStore, InMemoryStore, PgDocumentStore};
use bidan_web::WebServer;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};

/// 服务器命令行参数
#[derive(Parser, Debug)]
#[command(name = "bidan-server")]
#[command(about = "BidanMandiri 助产士诊所后端服务")]
struct Args {
    /// 服务器端口 (覆盖配置文件)
    #[arg(short, long)]
    port: Option<u16>,

    /// 配置文件路径
    #[arg(short, long)]
    config: Option<String>,

    /// 日志级别
    #[arg(short, long)]
    log_level: Option<String>,

    /// 存储后端: memory / postgres
    #[arg(short, long)]
    storage: Option<StorageBackend>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if let Some(backend) = args.storage {
        config.database.backend = backend;
    }
    ConfigValidator::new().validate(&config)?;

    // 初始化日志
    init_logging(&config.logging)?;

    info!("启动 BidanMandiri 服务器...");
    match args.config.as_deref() {
        Some(path) => info!("Configuration loaded successfully from: {}", path),
        None => info!("Configuration loaded from defaults and environment"),
    }
    info!("  监听地址: {}:{}", config.server.host, config.server.port);
    info!("  存储后端: {:?}", config.database.backend);

    let store: Arc<dyn DocumentStore> = match config.database.backend {
        StorageBackend::Memory => {
            warn!("Using in-memory storage, data is lost on restart");
            Arc::new(InMemoryStore::new())
        }
        StorageBackend::Postgres => {
            let pool = DatabasePool::new(
                &config.database.connection_string,
                config.database.max_connections,
            )
            .await?;
            let store = PgDocumentStore::new(pool);
            store.create_tables().await?;
            Arc::new(store)
        }
    };

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}", config.server.host))?;

    let server = WebServer::new(addr, store);
    if let Err(e) = server.run().await {
        error!("服务器启动失败: {}", e);
        return Err(e);
    }

    Ok(())
}
