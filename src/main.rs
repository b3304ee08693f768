use std::{path::Path, process, sync::Arc};

use prepwise::{
    application::{
        error::AppError,
        page::{ArticlePage, blocks_html},
        readiness::{ArticleSnapshot, ArticleWatcher, PollingConfig, ReadinessState},
        render::{MarkdownPipeline, PipelineConfig},
    },
    config::{self, Command, CopyArgs, ReadArgs, RenderArgs, Settings},
    domain::articles::ArticleSlug,
    infra::{
        cache::CachedContentSource, clipboard::Osc52Clipboard, error::InfraError,
        graphql::GraphqlContentSource, telemetry,
    },
};
use tokio::{io::AsyncWriteExt, sync::watch};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

const TARGET: &str = "prepwise::cli";

type ArticleSource = CachedContentSource<GraphqlContentSource>;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli().map_err(InfraError::from)?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match cli_args.command {
        Command::Read(args) => run_read(settings, args).await,
        Command::Render(args) => run_render(settings, args).await,
        Command::Copy(args) => run_copy(settings, args).await,
    }
}

async fn run_read(settings: Settings, args: ReadArgs) -> Result<(), AppError> {
    let slug = ArticleSlug::parse(&args.slug)?;
    let page = follow_article(&settings, slug).await?;

    for related in page.related() {
        info!(
            target = TARGET,
            slug = related.slug.as_str(),
            title = related.title.as_str(),
            "related article"
        );
    }

    write_output(args.output.as_deref(), &page.body_html()).await
}

async fn run_render(settings: Settings, args: RenderArgs) -> Result<(), AppError> {
    let markdown = tokio::fs::read_to_string(&args.file)
        .await
        .map_err(InfraError::from)?;
    let pipeline = MarkdownPipeline::new(PipelineConfig::from(&settings.render));
    let blocks = pipeline.render(&markdown)?;

    info!(
        target = TARGET,
        file = %args.file.display(),
        blocks = blocks.len(),
        "rendered markdown file"
    );

    write_output(None, &blocks_html(&blocks)).await
}

async fn run_copy(settings: Settings, args: CopyArgs) -> Result<(), AppError> {
    if args.block == 0 {
        return Err(AppError::validation("--block is 1-based"));
    }

    let slug = ArticleSlug::parse(&args.slug)?;
    let page = follow_article(&settings, slug).await?;

    let mut renderers = page.code_renderers();
    let available = renderers.len();
    let Some(renderer) = renderers.get_mut(args.block - 1) else {
        return Err(AppError::validation(format!(
            "article has {available} code block(s), block {} requested",
            args.block
        )));
    };

    let clipboard = Osc52Clipboard::stdout();
    renderer.try_copy(&clipboard)?;

    info!(
        target = TARGET,
        block = args.block,
        language = renderer.block().language.as_deref().unwrap_or("plain"),
        copied = renderer.is_copied(),
        "code block copied"
    );
    Ok(())
}

/// Follow `slug` until the article is ready and build its page.
async fn follow_article(settings: &Settings, slug: ArticleSlug) -> Result<ArticlePage, AppError> {
    let source = build_source(settings)?;
    let mut watcher = ArticleWatcher::new(source, PollingConfig::from(&settings.polling));

    let status_log = tokio::spawn(log_status_messages(watcher.subscribe()));
    watcher.watch(slug);
    let snapshot = watcher.settle().await;
    status_log.abort();
    watcher.unmount();

    let ArticleSnapshot { state, article, .. } = snapshot;
    match (state, article) {
        (ReadinessState::Ready, Some(article)) => {
            let pipeline = MarkdownPipeline::new(PipelineConfig::from(&settings.render));
            Ok(ArticlePage::build(article, &pipeline)?)
        }
        (ReadinessState::Failed(reason), _) => Err(AppError::from(reason)),
        (state, _) => Err(AppError::unexpected(format!(
            "watcher settled in non-terminal state `{}`",
            state.label()
        ))),
    }
}

fn build_source(settings: &Settings) -> Result<Arc<ArticleSource>, AppError> {
    let graphql =
        GraphqlContentSource::new(settings.source.endpoint.clone(), settings.source.timeout)?;
    Ok(Arc::new(CachedContentSource::new(
        graphql,
        settings.source.cache_capacity,
        settings.source.min_refetch_interval,
    )))
}

async fn log_status_messages(mut snapshots: watch::Receiver<ArticleSnapshot>) {
    let mut last: Option<&'static str> = None;
    while snapshots.changed().await.is_ok() {
        let message = snapshots.borrow_and_update().status_message;
        if message.is_some() && message != last {
            info!(
                target = TARGET,
                status = message.unwrap_or_default(),
                "article is being generated"
            );
        }
        last = message;
    }
}

async fn write_output(path: Option<&Path>, html: &str) -> Result<(), AppError> {
    match path {
        Some(path) => {
            tokio::fs::write(path, html)
                .await
                .map_err(InfraError::from)?;
            info!(target = TARGET, path = %path.display(), "wrote rendered body");
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout
                .write_all(html.as_bytes())
                .await
                .map_err(InfraError::from)?;
            stdout.flush().await.map_err(InfraError::from)?;
        }
    }
    Ok(())
}
