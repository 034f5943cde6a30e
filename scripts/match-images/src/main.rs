use anyhow::{ensure, Context, Result};
use clap::{ArgAction, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use rayon::prelude::*;
use rusqlite::{params, Connection};
use serde::Serialize;
use show_matcher::policy::DEFAULT_MIN_SCORE;
use show_matcher::{AcceptancePolicy, MatchResult, Matcher, MatcherConfig, Verdict};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const DEFAULT_DB: &str = "data/catalog.sqlite3";
const DEFAULT_IMAGES: &str = "public/images/shows";
const DEFAULT_REPORT: &str = "output/image_matches.csv";
const DEFAULT_EXTS: &str = "jpg,jpeg,png,webp";
const DEFAULT_URL_PREFIX: &str = "/images/shows/";
const DEFAULT_LOG: &str = "logs/match-images.log";

#[derive(Parser, Debug)]
#[command(
    name = "match-images",
    version,
    about = "Pair catalog shows with image files by fuzzy name matching"
)]
struct Cli {
    /// Directory holding the candidate images (only its first level is read)
    #[arg(long, default_value = DEFAULT_IMAGES)]
    images: PathBuf,

    /// SQLite catalog with a `shows(id, name, image_url)` table
    #[arg(long, default_value = DEFAULT_DB)]
    db: PathBuf,

    /// Extensions to consider (comma separated). Empty = all.
    #[arg(long, default_value = DEFAULT_EXTS)]
    exts: String,

    /// Also re-match shows that already have an image_url
    #[arg(long, action = ArgAction::SetTrue)]
    all_shows: bool,

    /// Prefix prepended to the file name when writing image_url
    #[arg(long, default_value = DEFAULT_URL_PREFIX)]
    url_prefix: String,

    /// CSV report of every show and its best image
    #[arg(long, default_value = DEFAULT_REPORT)]
    report: PathBuf,

    /// JSONL audit log with the full score breakdown per show. Ignored if empty.
    #[arg(long, default_value = "")]
    audit_log: String,

    /// Matcher tunables as JSON (missing fields keep their defaults)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Score a match must exceed to be reported at all [default: 40].
    /// Lowers the matcher's acceptance floor when set below it.
    #[arg(long)]
    min_score: Option<f64>,

    /// Score from which a match is written without review
    #[arg(long, default_value_t = show_matcher::policy::DEFAULT_HIGH_CONFIDENCE)]
    high_confidence: f64,

    /// Write matches flagged for review as well
    #[arg(long, action = ArgAction::SetTrue)]
    accept_review: bool,

    /// Do not touch the database, only report (true/false)
    #[arg(long, default_value = "true", action = ArgAction::Set)]
    dry_run: bool,

    /// Print every pairing
    #[arg(long, default_value_t = false)]
    verbose: bool,

    /// Enable debug logs (written to logs/match-images.log)
    #[arg(long, action = ArgAction::SetTrue)]
    debug: bool,

    /// Explicit log file path (enables file logging). Ignored if empty.
    #[arg(long, default_value = "")]
    log_file: String,
}

#[derive(Debug, Clone)]
struct ImageFile {
    file_name: String,
    stem: String,
}

#[derive(Debug, Clone)]
struct Show {
    id: i64,
    name: String,
}

#[derive(Debug, Clone)]
struct Assignment {
    show: usize,
    result: MatchResult,
    verdict: Verdict,
    runner_up: Option<String>,
    note: String,
}

#[derive(Serialize)]
struct AuditRecord<'a> {
    show_id: i64,
    show_name: &'a str,
    verdict: Verdict,
    image: Option<&'a str>,
    result: &'a MatchResult,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug, &cli.log_file);
    run(&cli)
}

fn run(cli: &Cli) -> Result<()> {
    ensure!(
        cli.images.is_dir(),
        "Image directory {:?} does not exist",
        cli.images
    );
    let policy = AcceptancePolicy {
        min_score: cli.min_score.unwrap_or(DEFAULT_MIN_SCORE),
        high_confidence: cli.high_confidence,
    };
    ensure!(
        policy.high_confidence >= policy.min_score,
        "--high-confidence ({}) must not be below --min-score ({})",
        policy.high_confidence,
        policy.min_score
    );
    let matcher = load_matcher(cli.config.as_deref(), cli.min_score)?;

    let allowed_exts = parse_exts(&cli.exts);
    let images = collect_images(&cli.images, &allowed_exts)?;
    if images.is_empty() {
        println!("No images under {:?}, nothing to match.", cli.images);
        return Ok(());
    }

    let mut conn = Connection::open(&cli.db)
        .with_context(|| format!("Opening catalog {:?}", cli.db))?;
    let shows = load_shows(&conn, !cli.all_shows)?;
    info!(
        "matching {} shows against {} images{}",
        shows.len(),
        images.len(),
        if cli.dry_run { " (dry-run)" } else { "" }
    );

    let mut assignments = match_shows(&matcher, &policy, &shows, &images);
    resolve_conflicts(&mut assignments, &shows);

    if cli.verbose {
        for assignment in &assignments {
            let show = &shows[assignment.show];
            let image = image_of(assignment, &images).map(|img| img.file_name.as_str());
            println!(
                "{:<8} {:<40} -> {} [score={:.1}]",
                assignment.verdict.as_str(),
                show.name,
                image.unwrap_or("-"),
                assignment.result.score
            );
        }
    }

    write_report(&cli.report, &shows, &images, &assignments)?;
    if !cli.audit_log.is_empty() {
        write_audit_log(Path::new(&cli.audit_log), &shows, &images, &assignments)?;
    }

    let updated = if cli.dry_run {
        0
    } else {
        apply_updates(
            &mut conn,
            &shows,
            &images,
            &assignments,
            &cli.url_prefix,
            cli.accept_review,
        )?
    };

    let count = |verdict: Verdict| assignments.iter().filter(|a| a.verdict == verdict).count();
    println!(
        "Summary: {} shows, accepted {}, review {}, unmatched {}, updated {}. Report: {:?}",
        shows.len(),
        count(Verdict::Accepted),
        count(Verdict::Review),
        count(Verdict::None),
        updated,
        cli.report
    );
    Ok(())
}

fn init_logging(debug: bool, log_file: &str) {
    if debug || !log_file.is_empty() {
        let log_path = if !log_file.is_empty() {
            PathBuf::from(log_file)
        } else {
            PathBuf::from(DEFAULT_LOG)
        };
        if let Some(parent) = log_path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        match fs::File::create(&log_path) {
            Ok(file) => {
                let cfg = ConfigBuilder::new()
                    .set_time_format_rfc3339()
                    .set_target_level(LevelFilter::Off)
                    .build();
                if let Err(e) = WriteLogger::init(LevelFilter::Debug, cfg, file) {
                    eprintln!("[warn] file logger init failed: {e}");
                } else {
                    println!("[debug] logs → {:?}", log_path);
                }
            }
            Err(e) => {
                eprintln!("[warn] cannot create log file {:?}: {e}", log_path);
                env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
                    .init();
            }
        }
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }
}

fn load_matcher(path: Option<&Path>, min_score: Option<f64>) -> Result<Matcher> {
    let mut config = match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("Reading matcher config {:?}", path))?;
            serde_json::from_str::<MatcherConfig>(&raw)
                .with_context(|| format!("Parsing matcher config {:?}", path))?
        }
        None => MatcherConfig::default(),
    };
    if let Some(min_score) = min_score {
        config.acceptance_floor = config.acceptance_floor.min(min_score);
    }
    debug!("matcher config: {:?}", config);
    Matcher::new(config).context("Invalid matcher config")
}

fn parse_exts(exts: &str) -> Option<Vec<String>> {
    let trimmed = exts.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(
            trimmed
                .split(',')
                .map(|s| s.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        )
    }
}

fn collect_images(dir: &Path, allowed_exts: &Option<Vec<String>>) -> Result<Vec<ImageFile>> {
    let mut images = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| format!("Listing {:?}", dir))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if let Some(exts) = allowed_exts {
            let ext = path
                .extension()
                .and_then(OsStr::to_str)
                .map(|s| s.to_ascii_lowercase());
            match ext {
                Some(ext) if exts.contains(&ext) => {}
                _ => continue,
            }
        }
        let (Some(file_name), Some(stem)) = (
            path.file_name().and_then(OsStr::to_str),
            path.file_stem().and_then(OsStr::to_str),
        ) else {
            warn!("skipping non UTF-8 file name {:?}", path);
            continue;
        };
        images.push(ImageFile {
            file_name: file_name.to_string(),
            stem: stem.to_string(),
        });
    }
    // Directory order is platform dependent; ties go to the first listed image.
    images.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    debug!("found {} images in {:?}", images.len(), dir);
    Ok(images)
}

fn load_shows(conn: &Connection, only_missing: bool) -> Result<Vec<Show>> {
    let sql = if only_missing {
        "SELECT id, name FROM shows
         WHERE name IS NOT NULL AND name <> ''
           AND (image_url IS NULL OR image_url = '')
         ORDER BY id"
    } else {
        "SELECT id, name FROM shows WHERE name IS NOT NULL AND name <> '' ORDER BY id"
    };
    let mut stmt = conn.prepare(sql).context("Preparing shows query")?;
    let rows = stmt.query_map([], |row| {
        Ok(Show {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    })?;
    let mut shows = Vec::new();
    for row in rows {
        shows.push(row?);
    }
    Ok(shows)
}

fn match_shows(
    matcher: &Matcher,
    policy: &AcceptancePolicy,
    shows: &[Show],
    images: &[ImageFile],
) -> Vec<Assignment> {
    let pool = matcher.pool(images.iter().map(|img| img.stem.clone()));
    let pb = ProgressBar::new(shows.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    let floor = matcher.config().acceptance_floor;
    let assignments: Vec<Assignment> = shows
        .par_iter()
        .enumerate()
        .map(|(index, show)| {
            // Ranking is stable, so the head is the earliest of the top scores.
            let mut ranked = pool.rank(&show.name).into_iter();
            let (result, runner_up) = match ranked.next() {
                Some(top) if top.score > floor && !show.name.trim().is_empty() => {
                    (MatchResult::from(top), ranked.next())
                }
                top => (MatchResult::no_match(), top),
            };
            let verdict = policy.classify(&result);
            let runner_up =
                runner_up.map(|scored| format!("{} ({:.1})", scored.label, scored.score));
            pb.inc(1);
            Assignment {
                show: index,
                result,
                verdict,
                runner_up,
                note: String::new(),
            }
        })
        .collect();
    pb.finish_and_clear();
    assignments
}

/// One image, one show: the highest score keeps a contested image (earlier
/// show on ties), the others drop to review.
fn resolve_conflicts(assignments: &mut [Assignment], shows: &[Show]) {
    let mut claims: HashMap<usize, Vec<usize>> = HashMap::new();
    for (position, assignment) in assignments.iter().enumerate() {
        if assignment.verdict == Verdict::None {
            continue;
        }
        if let Some(image) = assignment.result.matched_index {
            claims.entry(image).or_default().push(position);
        }
    }
    for positions in claims.into_values() {
        if positions.len() < 2 {
            continue;
        }
        let mut winner = positions[0];
        for &position in &positions[1..] {
            if assignments[position].result.score > assignments[winner].result.score {
                winner = position;
            }
        }
        let winner_id = shows[assignments[winner].show].id;
        for position in positions {
            if position == winner {
                continue;
            }
            let loser = &mut assignments[position];
            warn!(
                "image contested: show {} loses to show {}",
                shows[loser.show].id, winner_id
            );
            loser.verdict = Verdict::Review;
            loser.note = format!("image also claimed by show {winner_id}");
        }
    }
}

fn image_of<'a>(assignment: &Assignment, images: &'a [ImageFile]) -> Option<&'a ImageFile> {
    assignment
        .result
        .matched_index
        .and_then(|index| images.get(index))
}

fn write_report(
    path: &Path,
    shows: &[Show],
    images: &[ImageFile],
    assignments: &[Assignment],
) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .quote_style(csv::QuoteStyle::Necessary)
        .from_path(path)
        .with_context(|| format!("Open report CSV {:?}", path))?;
    writer.write_record([
        "show_id",
        "show_name",
        "image",
        "score",
        "verdict",
        "direct",
        "keyword",
        "exact_word",
        "partial",
        "runner_up",
        "note",
    ])?;
    for assignment in assignments {
        let show = &shows[assignment.show];
        let breakdown = &assignment.result.breakdown;
        let image = image_of(assignment, images)
            .map(|img| img.file_name.as_str())
            .unwrap_or("");
        writer.write_record([
            show.id.to_string().as_str(),
            show.name.as_str(),
            image,
            &format!("{:.1}", assignment.result.score),
            assignment.verdict.as_str(),
            &format!("{:.1}", breakdown.direct_similarity),
            &format!("{:.1}", breakdown.keyword_score),
            &format!("{:.1}", breakdown.exact_word_bonus),
            &format!("{:.1}", breakdown.partial_bonus),
            assignment.runner_up.as_deref().unwrap_or(""),
            assignment.note.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_audit_log(
    path: &Path,
    shows: &[Show],
    images: &[ImageFile],
    assignments: &[Assignment],
) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Open audit log {:?}", path))?;
    for assignment in assignments {
        let show = &shows[assignment.show];
        let record = AuditRecord {
            show_id: show.id,
            show_name: &show.name,
            verdict: assignment.verdict,
            image: image_of(assignment, images).map(|img| img.file_name.as_str()),
            result: &assignment.result,
        };
        writeln!(file, "{}", serde_json::to_string(&record)?)?;
    }
    Ok(())
}

fn apply_updates(
    conn: &mut Connection,
    shows: &[Show],
    images: &[ImageFile],
    assignments: &[Assignment],
    url_prefix: &str,
    accept_review: bool,
) -> Result<usize> {
    let tx = conn.transaction()?;
    let mut updated = 0usize;
    {
        let mut stmt = tx.prepare("UPDATE shows SET image_url = ?1 WHERE id = ?2")?;
        for assignment in assignments {
            let writable = match assignment.verdict {
                Verdict::Accepted => true,
                Verdict::Review => accept_review && assignment.note.is_empty(),
                Verdict::None => false,
            };
            if !writable {
                continue;
            }
            let Some(image) = image_of(assignment, images) else {
                continue;
            };
            let show = &shows[assignment.show];
            let url = format!("{}{}", url_prefix, image.file_name);
            debug!("show {} ({}) -> {}", show.id, show.name, url);
            updated += stmt.execute(params![url, show.id])?;
        }
    }
    tx.commit()?;
    Ok(updated)
}
