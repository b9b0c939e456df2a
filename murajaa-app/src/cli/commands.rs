use crate::api::server as api_server;
use crate::cli::opts::*;
use crate::tui::app::TuiApp;

use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use murajaa_core::{
    daily_streak,
    filters::{filter_by_due, filter_not_suspended},
    scheduler::record_review,
    student_stats, summarize, DueStatus, Learner, RecordStore, ReviewCard, ReviewEvent,
};
use murajaa_json::paths::data_root;
use murajaa_json::JsonStore;
use murajaa_sqlite::SqliteStore;
use std::io::{stdin, stdout, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;
use uuid::Uuid;

pub async fn run_cli(args: Cli) -> Result<()> {
    match &args.cmd {
        Command::Tui => {
            // (kept for completeness but main routes TUI directly)
            let store = open_store(&args.store, args.db_path.clone()).await?;
            let rt = Arc::new(Runtime::new()?);
            let mut app = TuiApp::new(store, rt);
            app.run()?;
            Ok(())
        }
        Command::Api(api) => {
            let store = open_store(&args.store, args.db_path.clone()).await?;
            let addr: std::net::SocketAddr = api.addr.parse()?;
            api_server::run(store, addr).await
        }
        _ => {
            let store = open_store(&args.store, args.db_path.clone()).await?;
            match args.cmd.clone() {
                Command::Learner(cmd) => learner_cmd(store, cmd).await,
                Command::Card(cmd) => card_cmd(store, cmd).await,
                Command::Review(cmd) => review_cmd(store, cmd).await,
                Command::Stats(cmd) => stats_cmd(store, cmd).await,
                Command::Export(cmd) => export_cmd(store, cmd).await,
                Command::Import(cmd) => import_cmd(store, cmd).await,
                _ => unreachable!(),
            }
        }
    }
}

pub async fn open_store(store: &StoreKind, db_path: Option<PathBuf>) -> Result<Arc<dyn RecordStore>> {
    match store {
        StoreKind::Json => {
            let s = JsonStore::open_default().await?;
            Ok(Arc::new(s))
        }
        StoreKind::Sqlite => {
            let p = db_path.unwrap_or_else(|| data_root().join("murajaa.sqlite3"));
            if let Some(parent) = p.parent() {
                std::fs::create_dir_all(parent).ok();
            }
            let s = SqliteStore::open_file(&p).await?;
            Ok(Arc::new(s))
        }
    }
}

async fn learner_cmd(store: Arc<dyn RecordStore>, cmd: LearnerCmd) -> Result<()> {
    match cmd {
        LearnerCmd::Add { name } => {
            let l = store.create_learner(&name).await?;
            println!("{}", l.id);
        }
        LearnerCmd::List => {
            let mut v = store.list_learners().await?;
            v.sort_by_key(|l| l.created_at);
            for l in v {
                println!("{}\t{}", l.id, l.name);
            }
        }
        LearnerCmd::Rm { learner } => {
            let l = resolve_learner(&*store, &learner).await?;
            store.delete_learner(l.id).await?;
            println!("ok");
        }
    }
    Ok(())
}

async fn card_cmd(store: Arc<dyn RecordStore>, cmd: CardCmd) -> Result<()> {
    match cmd {
        CardCmd::Add(a) => {
            let learner = resolve_learner(&*store, &a.learner).await?;
            let item_id = match &a.item {
                Some(s) => parse_uuid(s)?,
                None => Uuid::new_v4(),
            };
            let c = store
                .add_card(
                    learner.id,
                    item_id,
                    &a.front,
                    &a.back,
                    a.transliteration.as_deref(),
                    &a.tags,
                )
                .await?;
            println!("{}", c.id);
        }
        CardCmd::List { learner } => {
            let learner_id = if let Some(sel) = learner {
                Some(resolve_learner(&*store, &sel).await?.id)
            } else {
                None
            };
            let mut cards = store.list_cards(learner_id).await?;
            cards.sort_by_key(|c| c.created_at);
            for c in cards {
                let tags = if c.tags.is_empty() { "-".to_string() } else { c.tags.join(";") };
                println!(
                    "{}\t{}\t{}\tlearner={}\ttags={}\tsuspended={}",
                    c.id, c.front, c.back, c.learner_id, tags, c.suspended
                );
            }
        }
        CardCmd::Rm { card_id } => {
            let id = parse_uuid(&card_id)?;
            store.delete_card(id).await?;
            println!("ok");
        }
        CardCmd::Edit(e) => {
            let id = parse_uuid(&e.card_id)?;
            let mut card = store.get_card(id).await?;

            if let Some(f) = e.front { card.front = f; }
            if let Some(b) = e.back { card.back = b; }
            if e.clear_transliteration { card.transliteration = None; }
            if let Some(t) = e.transliteration { card.transliteration = Some(t); }

            if !e.add_tags.is_empty() || !e.rm_tags.is_empty() {
                let mut tags = card.tags.clone();
                for t in e.add_tags { if !tags.iter().any(|x| x.eq_ignore_ascii_case(&t)) { tags.push(t); } }
                if !e.rm_tags.is_empty() {
                    tags.retain(|x| !e.rm_tags.iter().any(|r| x.eq_ignore_ascii_case(r)));
                }
                card.tags = tags;
            }

            if e.suspend && e.unsuspend {
                anyhow::bail!("cannot use --suspend and --unsuspend together");
            } else if e.suspend {
                card.suspended = true;
            } else if e.unsuspend {
                card.suspended = false;
            }

            let _ = store.save_card(&card).await?;
            println!("ok");
        }
    }
    Ok(())
}

async fn review_cmd(store: Arc<dyn RecordStore>, cmd: ReviewCmd) -> Result<()> {
    let now = Utc::now();
    let learner = resolve_learner(&*store, &cmd.learner).await?;

    let mut cards = store.list_cards(Some(learner.id)).await?;
    cards = filter_not_suspended(&cards);

    let mut pool = Vec::new();
    if cmd.include_new { pool.extend(filter_by_due(&cards, now, DueStatus::New)); }
    pool.extend(filter_by_due(&cards, now, DueStatus::DueToday));
    if cmd.include_lapsed { pool.extend(filter_by_due(&cards, now, DueStatus::Lapsed)); }

    pool.sort_by_key(|c| (c.due_at, c.created_at));
    if pool.is_empty() {
        println!("no cards due");
        return Ok(());
    }

    let mut count = 0usize;
    for mut card in pool.into_iter().take(cmd.max) {
        count += 1;
        println!("\n[{}/{}] {}", count, cmd.max, card.id);
        println!("Q: {}", card.front);
        prompt_enter("[enter=show]")?;
        println!("A: {}", card.back);
        if let Some(t) = &card.transliteration { println!("transliteration: {}", t); }
        println!("[0=blackout .. 5=perfect, s=skip, q=quit]");
        let q = loop {
            let line = read_line("quality> ")?;
            let trimmed = line.trim().to_lowercase();
            match trimmed.as_str() {
                "s" | "skip" => break None,
                "q" | "quit" => return Ok(()),
                _ => match trimmed.parse::<u8>() {
                    Ok(n) if n <= 5 => break Some(n),
                    _ => { println!("enter a quality 0-5, s, or q"); }
                },
            }
        };

        if let Some(quality) = q {
            let out = record_review(card, quality, Utc::now())?;
            store.save_card(&out.updated_card).await?;
            store.insert_event(&out.event).await?;
            card = out.updated_card;
            println!("→ next due in {} day(s)", card.interval_days);
        }
    }

    println!("\nreviewed {}", count);
    Ok(())
}

async fn stats_cmd(store: Arc<dyn RecordStore>, cmd: StatsCmd) -> Result<()> {
    let learner = resolve_learner(&*store, &cmd.learner).await?;

    let cards = store.list_cards(Some(learner.id)).await?;
    let s = student_stats(&cards);
    println!("{}", learner.name);
    println!("cards: {} total, {} new, {} learning, {} mastered", s.total, s.new, s.learning, s.mastered);

    let events = store.list_events(Some(learner.id)).await?;
    let summary = summarize(&events);
    let streak = daily_streak(&events, Utc::now().date_naive());
    println!(
        "reviews: {} total, accuracy {:.0}%, streak {} day(s)",
        summary.totals.total,
        summary.totals.accuracy() * 100.0,
        streak
    );
    Ok(())
}

async fn export_cmd(store: Arc<dyn RecordStore>, cmd: ExportCmd) -> Result<()> {
    match cmd {
        ExportCmd::Json { path, learner } => {
            let learner_id = if let Some(sel) = &learner {
                Some(resolve_learner(&*store, sel).await?.id)
            } else { None };

            let mut learners = store.list_learners().await?;
            if let Some(lid) = learner_id {
                learners.retain(|l| l.id == lid);
            }
            learners.sort_by_key(|l| l.created_at);

            let mut cards = store.list_cards(learner_id).await?;
            cards.sort_by_key(|c| c.created_at);
            let events = store.list_events(learner_id).await?;

            let bundle = ExportBundle { version: 1, learners, cards, events };
            let s = serde_json::to_string_pretty(&bundle)?;
            std::fs::write(&path, s)?;
            println!("wrote {}", path.display());
        }
        ExportCmd::Csv { path, learner } => {
            let learner_id = if let Some(sel) = &learner {
                Some(resolve_learner(&*store, sel).await?.id)
            } else { None };
            let mut cards = store.list_cards(learner_id).await?;
            cards.sort_by_key(|c| c.created_at);

            let learners = store.list_learners().await?;
            let mut learner_name: std::collections::HashMap<uuid::Uuid, String> =
                learners.into_iter().map(|l| (l.id, l.name)).collect();

            let mut wtr = csv::Writer::from_path(&path)?;
            wtr.write_record(["learner", "item_id", "front", "back", "transliteration", "tags", "suspended"])?;
            for c in cards {
                let ln = learner_name
                    .remove(&c.learner_id)
                    .unwrap_or_else(|| c.learner_id.to_string());
                let tags = if c.tags.is_empty() { "".to_string() } else { c.tags.join(";") };
                wtr.write_record([
                    ln,
                    c.item_id.to_string(),
                    c.front,
                    c.back,
                    c.transliteration.unwrap_or_default(),
                    tags,
                    if c.suspended { "1".to_string() } else { "0".to_string() },
                ])?;
            }
            wtr.flush()?;
            println!("wrote {}", path.display());
        }
    }
    Ok(())
}

async fn import_cmd(store: Arc<dyn RecordStore>, cmd: ImportCmd) -> Result<()> {
    match cmd {
        ImportCmd::Json { path } => {
            let data = std::fs::read_to_string(&path)?;
            let bundle: ExportBundle = serde_json::from_str(&data)?;

            // Map exported learner ids onto this store's roster by name.
            let mut id_map: std::collections::HashMap<Uuid, Uuid> = std::collections::HashMap::new();
            for l in &bundle.learners {
                let here = ensure_learner_by_name(&*store, &l.name).await?;
                id_map.insert(l.id, here.id);
            }
            let mut imported = 0usize;
            for c in bundle.cards {
                let Some(&lid) = id_map.get(&c.learner_id) else { continue };
                // Cards start fresh; scheduling state is not carried over.
                if store
                    .add_card(lid, c.item_id, &c.front, &c.back, c.transliteration.as_deref(), &c.tags)
                    .await
                    .is_ok()
                {
                    imported += 1;
                }
            }
            println!("imported {} card(s)", imported);
        }
        ImportCmd::Csv { path, learner } => {
            let mut rdr = csv::Reader::from_path(&path)?;
            let mut target_learner = None;
            if let Some(sel) = learner {
                target_learner = Some(resolve_learner(&*store, &sel).await?);
            }
            let mut imported = 0usize;
            for rec in rdr.records() {
                let rec = rec?;
                let learner_name = rec.get(0).unwrap_or("").trim();
                let item_id = rec
                    .get(1)
                    .and_then(|s| Uuid::parse_str(s.trim()).ok())
                    .unwrap_or_else(Uuid::new_v4);
                let front = rec.get(2).unwrap_or("").to_string();
                let back = rec.get(3).unwrap_or("").to_string();
                let translit = rec.get(4).map(|s| s.to_string()).filter(|s| !s.is_empty());
                let tags = rec
                    .get(5)
                    .unwrap_or("")
                    .split(';')
                    .filter(|s| !s.is_empty())
                    .map(|s| s.to_string())
                    .collect::<Vec<_>>();
                let suspended = rec.get(6).unwrap_or("0").trim() == "1";

                let learner_obj = if let Some(l) = &target_learner {
                    l.clone()
                } else {
                    ensure_learner_by_name(&*store, learner_name).await?
                };
                let card = store
                    .add_card(learner_obj.id, item_id, &front, &back, translit.as_deref(), &tags)
                    .await?;
                if suspended {
                    store.set_suspended(card.id, true).await?;
                }
                imported += 1;
            }
            println!("imported {} card(s)", imported);
        }
    }
    Ok(())
}

// ===== Helpers =====
fn parse_uuid(s: &str) -> Result<uuid::Uuid> { Uuid::parse_str(s).map_err(|_| anyhow!("invalid uuid")) }

async fn resolve_learner<S: RecordStore + ?Sized>(store: &S, sel: &str) -> Result<Learner> {
    if let Ok(id) = Uuid::parse_str(sel) {
        if let Ok(l) = store.get_learner(id).await { return Ok(l); }
    }
    let learners = store.list_learners().await?;
    if let Some(l) = learners.into_iter().find(|l| l.name.eq_ignore_ascii_case(sel)) { return Ok(l); }
    bail!("learner not found: {}", sel)
}

async fn ensure_learner_by_name<S: RecordStore + ?Sized>(store: &S, name: &str) -> Result<Learner> {
    let learners = store.list_learners().await?;
    if let Some(l) = learners.into_iter().find(|l| l.name.eq_ignore_ascii_case(name)) { return Ok(l); }
    let l = store.create_learner(name).await?;
    Ok(l)
}

fn prompt_enter(label: &str) -> Result<()> { print!("{label}"); stdout().flush().ok(); let mut s = String::new(); stdin().read_line(&mut s)?; Ok(()) }
fn read_line(prompt: &str) -> Result<String> { print!("{prompt}"); stdout().flush().ok(); let mut s = String::new(); stdin().read_line(&mut s)?; Ok(s) }

#[derive(serde::Serialize, serde::Deserialize)]
struct ExportBundle {
    version: u32,
    learners: Vec<Learner>,
    cards: Vec<ReviewCard>,
    events: Vec<ReviewEvent>,
}
