//! 命令行入口：翻译单个 HTML 文档并输出结果

#[cfg(feature = "cli")]
use std::fs;
#[cfg(feature = "cli")]
use std::io::{self, Write};
#[cfg(feature = "cli")]
use std::path::{Path, PathBuf};
#[cfg(feature = "cli")]
use std::sync::Arc;

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use tracing_subscriber::FmtSubscriber;
#[cfg(feature = "cli")]
use url::Url;

#[cfg(feature = "cli")]
use page_translator::env::{self, core::LogLevel, core::NoColor, EnvVar};
#[cfg(feature = "cli")]
use page_translator::parsers::html::{get_document_lang, html_to_dom, serialize_document};
#[cfg(feature = "cli")]
use page_translator::translation::config::constants;
#[cfg(feature = "cli")]
use page_translator::translation::services::detector::primary_subtag;
#[cfg(feature = "cli")]
use page_translator::translation::services::{
    DeclaredLanguageDetector, HttpTranslationBackend, LoggingBroadcaster,
};
#[cfg(feature = "cli")]
use page_translator::translation::{
    ConfigManager, TranslationCapabilities, TranslationError, TranslationOrchestrator,
};
#[cfg(feature = "cli")]
use page_translator::{ContentWindow, FrameInfo, TranslationStatus, Viewport};

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "page-translator")]
#[command(author, version, about = "Translate an HTML document in place", long_about = None)]
struct Args {
    /// HTML 文件路径或 http(s) 地址
    #[arg(required = true)]
    input: String,

    /// 源语言（缺省时取配置的 source_lang，为 auto 时按文档声明检测）
    #[arg(short = 'f', long)]
    from: Option<String>,

    /// 目标语言
    #[arg(short = 't', long)]
    to: Option<String>,

    /// 翻译服务地址
    #[arg(long)]
    api_url: Option<String>,

    /// 配置文件
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 输出文件（默认写到标准输出）
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// 文档编码
    #[arg(short, long, default_value = "utf-8")]
    encoding: String,

    /// 文档 URL（默认取输入地址或 file:// 路径）
    #[arg(long)]
    url: Option<String>,
}

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = LogLevel::get().unwrap_or_else(|_| "info".to_string());
    FmtSubscriber::builder()
        .with_max_level(env::parse_level(&level))
        .with_ansi(!NoColor::get_or_default(false))
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let manager = match &args.config {
        Some(path) => ConfigManager::from_file(&path.to_string_lossy())?,
        None => ConfigManager::new()?,
    };
    let defaults = manager.get_config();
    let target = args.to.clone().unwrap_or_else(|| defaults.target_lang.clone());
    let config = manager.create_simple_config(&target, args.api_url.as_deref());

    let document_url = resolve_document_url(&args)?;
    let bytes = read_input(&args.input).await?;
    let dom = html_to_dom(&bytes, &args.encoding)?;
    let declared = get_document_lang(&dom);

    let capabilities = TranslationCapabilities::new(
        Arc::new(DeclaredLanguageDetector::new(declared.clone())),
        Arc::new(HttpTranslationBackend::new(&config)?),
        Arc::new(LoggingBroadcaster),
    );
    let orchestrator = TranslationOrchestrator::new(capabilities, &config)?;

    let frame = FrameInfo::new(0, 0);
    let window = ContentWindow::new(dom, Viewport::new(1280.0, 800.0));
    orchestrator.attach_frame(frame, document_url.as_str(), window.clone())?;

    // --from 优先，其次是配置中非 auto 的源语言，否则检测
    let configured = Some(config.source_lang.trim())
        .filter(|lang| !lang.is_empty() && *lang != constants::DEFAULT_SOURCE_LANG)
        .map(str::to_string);
    let source = match args.from.clone().or(configured) {
        Some(from) => from,
        None => detect_source(&orchestrator, frame, declared.as_deref()).await?,
    };
    tracing::info!("翻译 {} -> {}", source, target);

    match orchestrator.translate(&frame, &source, &target).await? {
        Some(TranslationStatus::Translated) => {}
        Some(status) => {
            return Err(TranslationError::InvalidState(format!(
                "翻译结束于意外状态: {}",
                status
            ))
            .into());
        }
        None => {
            return Err(
                TranslationError::StaleOwner("文档在翻译完成前被关闭".to_string()).into(),
            );
        }
    }

    let html = {
        let dom = window.read_dom()?;
        serialize_document(&dom, &args.encoding)?
    };
    orchestrator.flush_notifications().await;

    match &args.output {
        Some(path) => fs::write(path, &html)?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&html)?;
            stdout.flush()?;
        }
    }

    Ok(())
}

/// 检测源语言；非网页地址无法检测时退回到文档声明的语言
#[cfg(feature = "cli")]
async fn detect_source(
    orchestrator: &TranslationOrchestrator,
    frame: FrameInfo,
    declared: Option<&str>,
) -> Result<String, TranslationError> {
    let status = orchestrator.detect_language(&frame).await?;
    let detected = orchestrator
        .frame(&frame)
        .and_then(|controller| controller.detected_language());

    match (status, detected) {
        (Some(TranslationStatus::Offer), Some(detected)) => Ok(detected.language),
        _ => declared.map(primary_subtag).ok_or_else(|| {
            TranslationError::DetectionError(
                "无法确定文档语言，请使用 --from 指定源语言".to_string(),
            )
        }),
    }
}

#[cfg(feature = "cli")]
fn resolve_document_url(args: &Args) -> Result<Url, TranslationError> {
    let raw = match &args.url {
        Some(url) => url.clone(),
        None if is_remote(&args.input) => args.input.clone(),
        None => {
            let path = fs::canonicalize(Path::new(&args.input))?;
            return Url::from_file_path(&path).map_err(|_| {
                TranslationError::InvalidInput(format!("无法转换为 URL: {}", path.display()))
            });
        }
    };
    Url::parse(&raw).map_err(|e| TranslationError::InvalidInput(format!("无效的 URL {}: {}", raw, e)))
}

#[cfg(feature = "cli")]
fn is_remote(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

#[cfg(feature = "cli")]
async fn read_input(input: &str) -> Result<Vec<u8>, TranslationError> {
    if !is_remote(input) {
        return Ok(fs::read(input)?);
    }

    tracing::debug!("下载文档: {}", input);
    let response = reqwest::get(input).await?;
    if !response.status().is_success() {
        return Err(TranslationError::NetworkError(format!(
            "下载失败: {} ({})",
            input,
            response.status()
        )));
    }
    Ok(response.bytes().await?.to_vec())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature is not enabled. Please compile with --features=\"cli\"");
    std::process::exit(1);
}
