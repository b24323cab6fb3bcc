// src/cli/score.rs — The score command: wire providers, judge, and scheduler

use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use crate::core::aggregate::AggregateState;
use crate::core::scheduler::Scheduler;
use crate::corpus::github::GithubComments;
use crate::corpus::local::LocalCorpus;
use crate::infra::config::Config;
use crate::judge::llm::LlmJudge;
use crate::judge::retry::{RetryConfig, RetryJudge};
use crate::judge::SemanticJudge;
use crate::report;

pub struct ScoreArgs {
    pub corpus: String,
    pub repo: Option<String>,
    pub concurrency: Option<usize>,
    pub json: Option<String>,
    pub quiet: bool,
}

pub async fn run_score(args: ScoreArgs, config: &Config) -> anyhow::Result<()> {
    let mut eval_config = config.eval_config();
    if let Some(n) = args.concurrency {
        eval_config.concurrency = n.max(1);
    }

    let llm = LlmJudge::from_config(&config.judge)?;
    let usage = llm.usage();
    let judge: Arc<dyn SemanticJudge> = Arc::new(RetryJudge::with_config(
        Arc::new(llm),
        RetryConfig::from_eval_config(&eval_config),
    ));

    let corpus = Arc::new(LocalCorpus::new(&args.corpus));
    let state = Arc::new(Mutex::new(AggregateState::new()));

    let mut scheduler = Scheduler::new(corpus, judge, eval_config, state.clone());

    let repo = args
        .repo
        .or_else(|| config.github.as_ref().and_then(|g| g.repo.clone()));
    if let Some(repo) = repo {
        let token_env = config
            .github
            .as_ref()
            .map(|g| g.token_env.clone())
            .unwrap_or_else(|| "GITHUB_TOKEN".into());
        let token = std::env::var(&token_env)
            .map_err(|_| anyhow::anyhow!("GitHub token not found; set {token_env}"))?;
        let github = GithubComments::connect(&repo, token).await?;
        scheduler = scheduler.with_comment_provider(Arc::new(github));
    }

    if !args.quiet {
        scheduler = scheduler.with_progress(super::progress::terminal_progress());
    }

    // Ctrl-C stops dispatching new cases; in-flight cases drain.
    let (cancel_tx, cancel_rx) = watch::channel(false);
    scheduler = scheduler.with_cancellation(cancel_rx);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, draining in-flight cases");
            let _ = cancel_tx.send(true);
        }
    });

    scheduler.run().await?;

    let state = state
        .lock()
        .map_err(|_| anyhow::anyhow!("aggregate lock poisoned"))?;
    let report = report::build_report(&state, Some(usage.snapshot()));

    print!("{}", report::render(&report));

    if let Some(path) = args.json {
        std::fs::write(&path, serde_json::to_string_pretty(&report)?)?;
        tracing::info!("wrote JSON report to {path}");
    }

    Ok(())
}
