//! smartstox-client — command line front for the dashboard data layer.
//!
//! ```text
//! smartstox-client                        # load blog list through a FetchView
//! smartstox-client post <slug>            # load one post (404 gets the empty-retry budget)
//! smartstox-client predict <SYMBOLS> [EXCHANGE] [--csv]
//! ```
//!
//! Configuration comes from `config/client.{toml,json}` (or `$SMARTSTOX_CONFIG_PATH`)
//! plus env overrides; `.env` is honoured.

use anyhow::{bail, Context, Result};
use smartstox_client::blog::BlogPost;
use smartstox_client::metrics::Metrics;
use smartstox_client::predictions::{currency_symbol, to_csv, ShortTermRequest};
use smartstox_client::{ApiClient, AuthToken, ClientConfig, FetchState, FetchView};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Logs are on in debug builds, or when SMARTSTOX_LOG=1.
/// SMARTSTOX_LOG_JSON=1 switches to JSON lines.
fn init_tracing() {
    let enabled = cfg!(debug_assertions)
        || std::env::var("SMARTSTOX_LOG")
            .ok()
            .is_some_and(|v| v == "1");
    if !enabled {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("fetch=info,api=info,warn"));
    let json = std::env::var("SMARTSTOX_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }
}

fn print_posts(state: &FetchState<BlogPost>) {
    match state {
        FetchState::Loading => println!("loading..."),
        FetchState::Empty => println!("No posts yet."),
        FetchState::Error(msg) => println!("Could not load posts: {msg}"),
        FetchState::Success(posts) => {
            for p in posts {
                println!(
                    "{} | {} | By {}",
                    p.created_at.format("%Y-%m-%d"),
                    p.title,
                    p.display_author()
                );
                let tags = p.tag_list();
                if !tags.is_empty() {
                    println!("  #{}", tags.join(" #"));
                }
                println!("  {}", p.preview());
            }
        }
    }
}

async fn run(args: &[String], api: &ApiClient) -> Result<()> {
    match args.first().map(String::as_str) {
        None | Some("posts") => {
            let view = FetchView::new(api.controller());
            let source = api.posts_source();
            let mut state = view.load(&source).await;
            if matches!(state, Some(FetchState::Error(_))) {
                tracing::info!(target: "api", "retrying blog list once more");
                state = view.retry(&source).await;
            }
            print_posts(&state.unwrap_or_else(|| view.state()));
        }
        Some("post") => {
            let Some(slug) = args.get(1) else {
                bail!("usage: smartstox-client post <slug>");
            };
            let view = FetchView::new(api.controller());
            let state = view.load(&api.post_detail_source(slug.clone())).await;
            match state.unwrap_or_else(|| view.state()) {
                FetchState::Success(mut posts) => {
                    if let Some(p) = posts.pop() {
                        println!("{}\n\n{}", p.title, p.content);
                    }
                }
                FetchState::Empty => println!("Post not found: {slug}"),
                other => print_posts(&other),
            }
        }
        Some("predict") => {
            let Some(symbols) = args.get(1) else {
                bail!("usage: smartstox-client predict <SYMBOLS> [EXCHANGE] [--csv]");
            };
            let exchange = args
                .get(2)
                .filter(|a| !a.starts_with("--"))
                .cloned()
                .unwrap_or_else(|| "NASDAQ".to_string());
            let as_csv = args.iter().any(|a| a == "--csv");

            let req = ShortTermRequest::new(symbols, exchange.clone(), "Stock");
            let rows = api
                .short_term_predict(&req)
                .await
                .context("short-term prediction")?;

            if as_csv {
                println!("{}", to_csv(&rows));
                return Ok(());
            }
            let cur = currency_symbol(&exchange);
            for r in &rows {
                if let Some(err) = &r.error {
                    println!("{:<8} error: {err}", r.symbol);
                    continue;
                }
                let fused = r.fused();
                println!(
                    "{:<8} {}{:>10.2} -> {}{:>10.2}  [{}] ({})",
                    r.symbol,
                    cur,
                    r.current_price.unwrap_or_default(),
                    cur,
                    r.predicted_price.unwrap_or_default(),
                    fused.label,
                    fused.badge_class()
                );
            }
        }
        Some(other) => bail!("unknown command: {other}"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op elsewhere.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = ClientConfig::load_default().context("loading client config")?;
    let metrics = if std::env::var("SMARTSTOX_METRICS").is_ok_and(|v| v == "1") {
        Some(Metrics::init(&cfg.retry)?)
    } else {
        None
    };

    let mut api = ApiClient::new(&cfg).context("building HTTP client")?;
    if let Ok(token) = std::env::var("SMARTSTOX_TOKEN") {
        api = api.with_token(AuthToken::new(token));
        match api.me().await {
            Ok(Some(user)) => tracing::info!(target: "api", email = %user.email, "authenticated"),
            Ok(None) => {}
            Err(e) => tracing::warn!(target: "api", error = %e, "token rejected"),
        }
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    run(&args, &api).await?;

    if let Some(m) = metrics {
        eprintln!("{}", m.render());
    }
    Ok(())
}
