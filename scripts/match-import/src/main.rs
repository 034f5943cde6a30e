use anyhow::{anyhow, ensure, Context, Result};
use clap::{ArgAction, Parser};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use show_matcher::policy::DEFAULT_MIN_SCORE;
use show_matcher::{AcceptancePolicy, Breakdown, Matcher, MatcherConfig, Verdict};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_DB: &str = "data/catalog.sqlite3";
const DEFAULT_OUT: &str = "output/import_matches.csv";
const DEFAULT_LOG: &str = "logs/match-import.log";

const MATCH_COLUMNS: [&str; 8] = [
    "match_id",
    "match_name",
    "match_status",
    "score",
    "direct",
    "keyword",
    "exact_word",
    "partial",
];

static IDENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

#[derive(Parser, Debug)]
#[command(name = "match-import", version)]
struct Cli {
    /// CSV file to import (first line holds the headers).
    #[arg(long)]
    input: PathBuf,

    /// SQLite catalog with a `shows` table.
    #[arg(long, default_value = DEFAULT_DB)]
    db: PathBuf,

    /// Header of the column holding the show name.
    #[arg(long, default_value = "name")]
    name_column: String,

    /// Destination CSV: the input rows plus the match columns.
    #[arg(long = "out", default_value = DEFAULT_OUT)]
    out_path: PathBuf,

    /// Columns copied into the matched catalog row (comma separated).
    #[arg(long, default_value = "")]
    merge_columns: String,

    /// Matcher tunables as JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Score a fuzzy match must exceed to be reported [default: 40].
    /// Lowers the matcher's acceptance floor when set below it.
    #[arg(long)]
    min_score: Option<f64>,

    /// Score from which a fuzzy match is merged without review.
    #[arg(long, default_value_t = show_matcher::policy::DEFAULT_HIGH_CONFIDENCE)]
    high_confidence: f64,

    /// Dry-run mode: report only, never write to the catalog (true/false).
    #[arg(long, default_value = "true", action = ArgAction::Set)]
    dry_run: bool,

    /// Enable debug logs (written to logs/match-import.log).
    #[arg(long, action = ArgAction::SetTrue)]
    debug: bool,

    /// Explicit log file path. Ignored if empty.
    #[arg(long, default_value = "")]
    log_file: String,
}

#[derive(Debug, Clone)]
struct CatalogRow {
    id: i64,
    name: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum MatchStatus {
    Exact,
    Fuzzy(Verdict),
}

impl MatchStatus {
    fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Exact => "exact",
            MatchStatus::Fuzzy(verdict) => verdict.as_str(),
        }
    }

    fn mergeable(&self) -> bool {
        matches!(self, MatchStatus::Exact | MatchStatus::Fuzzy(Verdict::Accepted))
    }
}

#[derive(Debug, Clone)]
struct RowMatch {
    catalog: Option<usize>,
    status: MatchStatus,
    score: f64,
    breakdown: Breakdown,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if !cli.input.exists() {
        return Err(anyhow!("Import file {:?} does not exist.", cli.input));
    }
    init_logging(cli.debug, &cli.log_file);
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let policy = AcceptancePolicy {
        min_score: cli.min_score.unwrap_or(DEFAULT_MIN_SCORE),
        high_confidence: cli.high_confidence,
    };
    ensure!(
        policy.high_confidence >= policy.min_score,
        "--high-confidence must not be below --min-score"
    );
    let matcher = load_matcher(cli.config.as_deref(), cli.min_score)?;
    let mut connection = Connection::open(&cli.db)
        .with_context(|| format!("Impossible to open catalog {:?}", cli.db))?;
    let catalog = load_catalog(&connection)?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(&cli.input)
        .with_context(|| format!("Open import CSV {:?}", cli.input))?;
    let headers = reader.headers()?.clone();
    let name_idx = headers
        .iter()
        .position(|h| h.trim() == cli.name_column)
        .ok_or_else(|| anyhow!("Column {:?} not found in {:?}", cli.name_column, cli.input))?;
    let mut records = Vec::new();
    for record in reader.records() {
        records.push(record?);
    }
    println!(
        "Matching {} import rows against {} catalog shows{}",
        records.len(),
        catalog.len(),
        if cli.dry_run { " (dry-run)" } else { "" }
    );

    let names: Vec<&str> = records
        .iter()
        .map(|record| record.get(name_idx).unwrap_or(""))
        .collect();
    let matches = match_rows(&matcher, &policy, &catalog, &names);
    write_matches_csv(&cli.out_path, &headers, &records, &catalog, &matches)?;

    let merge_columns = parse_columns(&cli.merge_columns);
    let mut merged = 0usize;
    if !merge_columns.is_empty() {
        let plan = plan_merge(&connection, &headers, &merge_columns)?;
        if cli.dry_run {
            println!("[DRY-RUN] would merge columns {:?}", merge_columns);
        } else {
            merged = merge_rows(&mut connection, &plan, &records, &catalog, &matches)?;
        }
    }

    let count = |status: &str| matches.iter().filter(|m| m.status.as_str() == status).count();
    println!(
        "Done. exact {}, accepted {}, review {}, unmatched {}, merged {}. CSV written to {:?}.",
        count("exact"),
        count("accepted"),
        count("review"),
        count("none"),
        merged,
        cli.out_path
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
    Matcher::new(config).context("Invalid matcher config")
}

fn load_catalog(connection: &Connection) -> Result<Vec<CatalogRow>> {
    let mut stmt = connection.prepare(
        "SELECT id, name FROM shows WHERE name IS NOT NULL AND name <> '' ORDER BY id",
    )?;
    let results = stmt.query_map([], |row| {
        Ok(CatalogRow {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    })?;
    let mut rows = Vec::new();
    for result in results {
        rows.push(result?);
    }
    Ok(rows)
}

fn match_rows(
    matcher: &Matcher,
    policy: &AcceptancePolicy,
    catalog: &[CatalogRow],
    names: &[&str],
) -> Vec<RowMatch> {
    let normalizer = matcher.normalizer();
    let mut exact: HashMap<String, usize> = HashMap::new();
    for (index, row) in catalog.iter().enumerate() {
        let key = normalizer.normalize(&row.name);
        if !key.is_empty() {
            exact.entry(key).or_insert(index);
        }
    }
    let pool = matcher.pool(catalog.iter().map(|row| row.name.clone()));

    names
        .iter()
        .map(|name| {
            if let Some(&index) = exact.get(&normalizer.normalize(name)) {
                let (score, breakdown) = matcher.score_candidate(name, &catalog[index].name);
                debug!("exact: {:?} -> show {}", name, catalog[index].id);
                return RowMatch {
                    catalog: Some(index),
                    status: MatchStatus::Exact,
                    score,
                    breakdown,
                };
            }
            let result = pool.best_match(name);
            let verdict = policy.classify(&result);
            debug!("fuzzy: {:?} -> {:?} ({})", name, result.matched_label, verdict);
            RowMatch {
                catalog: result.matched_index.filter(|_| verdict != Verdict::None),
                status: MatchStatus::Fuzzy(verdict),
                score: result.score,
                breakdown: result.breakdown,
            }
        })
        .collect()
}

fn write_matches_csv(
    path: &Path,
    headers: &csv::StringRecord,
    records: &[csv::StringRecord],
    catalog: &[CatalogRow],
    matches: &[RowMatch],
) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .quote_style(csv::QuoteStyle::Necessary)
        .from_path(path)?;
    let mut header_row: Vec<&str> = headers.iter().collect();
    header_row.extend(MATCH_COLUMNS);
    writer.write_record(&header_row)?;
    for (record, row_match) in records.iter().zip(matches) {
        let matched = row_match.catalog.map(|index| &catalog[index]);
        let breakdown = row_match.breakdown.rounded();
        let mut fields: Vec<String> = record.iter().map(str::to_string).collect();
        fields.extend([
            matched.map(|row| row.id.to_string()).unwrap_or_default(),
            matched.map(|row| row.name.clone()).unwrap_or_default(),
            row_match.status.as_str().to_string(),
            format!("{:.1}", row_match.score),
            format!("{:.1}", breakdown.direct_similarity),
            format!("{:.1}", breakdown.keyword_score),
            format!("{:.1}", breakdown.exact_word_bonus),
            format!("{:.1}", breakdown.partial_bonus),
        ]);
        writer.write_record(&fields)?;
    }
    writer.flush()?;
    Ok(())
}

fn parse_columns(value: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .collect()
}

/// CSV column index and catalog column name for each merged field.
#[derive(Debug)]
struct MergePlan {
    columns: Vec<(usize, String)>,
}

fn plan_merge(
    connection: &Connection,
    headers: &csv::StringRecord,
    columns: &[String],
) -> Result<MergePlan> {
    let mut stmt = connection.prepare("PRAGMA table_info(shows)")?;
    let existing: HashSet<String> = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<_>>()?;
    let mut plan = Vec::new();
    for column in columns {
        ensure!(IDENT_RE.is_match(column), "Invalid column name {:?}", column);
        ensure!(column != "id", "Refusing to overwrite the id column");
        ensure!(
            existing.contains(column),
            "Column {:?} does not exist in table shows",
            column
        );
        let csv_idx = headers
            .iter()
            .position(|h| h.trim() == column)
            .ok_or_else(|| anyhow!("Column {:?} missing from the import CSV", column))?;
        plan.push((csv_idx, column.clone()));
    }
    Ok(MergePlan { columns: plan })
}

fn merge_rows(
    connection: &mut Connection,
    plan: &MergePlan,
    records: &[csv::StringRecord],
    catalog: &[CatalogRow],
    matches: &[RowMatch],
) -> Result<usize> {
    let tx = connection.transaction()?;
    let mut merged = 0usize;
    let mut touched: HashMap<i64, usize> = HashMap::new();
    for (line, (record, row_match)) in records.iter().zip(matches).enumerate() {
        if !row_match.status.mergeable() {
            continue;
        }
        let Some(index) = row_match.catalog else {
            continue;
        };
        let show = &catalog[index];
        if let Some(previous) = touched.insert(show.id, line) {
            warn!(
                "show {} matched by import rows {} and {}, later values win",
                show.id,
                previous + 1,
                line + 1
            );
        }
        let mut assignments = Vec::new();
        let mut values = Vec::new();
        for (csv_idx, column) in &plan.columns {
            let value = record.get(*csv_idx).unwrap_or("").trim();
            if value.is_empty() {
                continue;
            }
            values.push(Value::Text(value.to_string()));
            assignments.push(format!("{} = ?{}", column, values.len()));
        }
        if assignments.is_empty() {
            continue;
        }
        values.push(Value::Integer(show.id));
        let sql = format!(
            "UPDATE shows SET {} WHERE id = ?{}",
            assignments.join(", "),
            values.len()
        );
        merged += tx
            .execute(&sql, params_from_iter(values.iter()))
            .with_context(|| format!("Merging import row {} into show {}", line + 1, show.id))?;
    }
    tx.commit()?;
    info!("merged {} import rows into the catalog", merged);
    Ok(merged)
}
