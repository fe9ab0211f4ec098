use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use stride_lab::{
    architecture::{self, TrustZone},
    config::{self, Config},
    startup,
    threat::StrideCategory,
    Phase, ToggleOutcome,
};

/// stridectl: walk the connected-vehicle STRIDE threat model from a terminal.
///
/// Mitigation flags persist in the configured state directory between runs;
/// the phase and category selection do not.
#[derive(Debug, Parser)]
#[command(name = "stridectl")]
#[command(version)]
struct Cli {
    /// Config file (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// State directory; overrides storage.dir and forces file storage.
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Print/validate/update configuration.
    Config {
        #[command(subcommand)]
        cmd: ConfigCmd,
    },

    /// Architecture overview: nodes, trust zones and data flows.
    Architecture,

    /// STRIDE analysis; with --category, show that category's threat.
    Analyze {
        /// Category letter or name (e.g. T, tampering, "Denial of Service")
        #[arg(long)]
        category: Option<String>,
    },

    /// Mitigation board: every threat with its status.
    Threats,

    /// Flip the mitigation status of a threat (e.g. S-1).
    Toggle { id: String },

    /// Security score and posture band.
    Score,

    /// Compliance report.
    Report,

    /// Discard persisted mitigation state.
    Reset,
}

#[derive(Debug, Subcommand)]
enum ConfigCmd {
    /// Print a config example to stdout
    Example,

    /// Validate a config file (loads and parses TOML)
    Validate {
        #[arg(long)]
        path: PathBuf,
    },

    /// Show current config file (raw TOML)
    Show {
        #[arg(long)]
        path: PathBuf,
    },

    /// Set a config value.
    ///
    /// Key format: dotted path, e.g. `storage.dir` or `posture.strong_score`.
    Set {
        #[arg(long)]
        path: PathBuf,

        /// Dotted key (e.g. storage.backend)
        key: String,

        /// Value. Simple auto-typing is supported: true/false, ints, floats, or string.
        value: String,
    },

    /// Unset a config value (remove key).
    Unset {
        #[arg(long)]
        path: PathBuf,

        /// Dotted key (e.g. logging.filter)
        key: String,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let cmd = match cli.cmd {
        Cmd::Config { cmd } => return handle_config(cmd),
        other => other,
    };

    let mut cfg = Config::resolve(cli.config.as_deref())?;
    if let Some(dir) = cli.state_dir {
        cfg.storage.dir = dir;
        cfg.storage.backend = config::StorageBackend::File;
    }
    startup::init_tracing(&cfg.logging.filter);

    let store = startup::build_state_store(&cfg.storage)?;

    if matches!(cmd, Cmd::Reset) {
        store
            .remove(&cfg.storage.key)
            .context("remove persisted state")?;
        print_json(&json!({ "reset": true, "key": cfg.storage.key }));
        return Ok(());
    }

    let (mut session, outcome) = startup::open_session(&cfg, store);

    match cmd {
        Cmd::Architecture => {
            session.set_phase(Phase::Definition);
            let zones: Vec<Value> = TrustZone::ALL
                .into_iter()
                .map(|z| {
                    let nodes: Vec<&str> = architecture::nodes_in(z).map(|n| n.id).collect();
                    json!({
                        "zone": z,
                        "title": z.title(),
                        "description": z.description(),
                        "nodes": nodes,
                    })
                })
                .collect();
            let links: Vec<Value> = architecture::LINKS
                .iter()
                .map(|l| {
                    json!({
                        "source": l.source,
                        "target": l.target,
                        "label": l.label,
                        "attack": l.is_attack(),
                        "secured": l.is_secured(session.threats()),
                    })
                })
                .collect();
            print_json(&json!({
                "phase": session.phase(),
                "overview": architecture::OVERVIEW,
                "nodes": architecture::NODES,
                "trust_zones": zones,
                "links": links,
            }));
        }

        Cmd::Analyze { category } => {
            session.set_phase(Phase::Analysis);
            if let Some(raw) = category {
                let Some(cat) = StrideCategory::parse(&raw) else {
                    anyhow::bail!("unknown STRIDE category: {raw}");
                };
                session.set_active_category(cat);
            }

            let categories: Vec<Value> = StrideCategory::ALL
                .into_iter()
                .map(|cat| {
                    let t = session.threats().iter().find(|t| t.category == cat);
                    json!({
                        "category": cat,
                        "threat": t.map(|t| &t.id),
                        "title": t.map(|t| &t.title),
                        "impact": t.map(|t| t.impact),
                    })
                })
                .collect();
            let highlighted: Vec<Value> = session
                .highlighted_nodes()
                .into_iter()
                .map(|n| json!({ "id": n.id, "label": n.label }))
                .collect();

            print_json(&json!({
                "phase": session.phase(),
                "active_category": session.active_category(),
                "categories": categories,
                "active_threat": session.active_threat(),
                "highlighted_nodes": highlighted,
            }));
        }

        Cmd::Threats => {
            session.set_phase(Phase::Mitigation);
            let board: Vec<Value> = session
                .threats()
                .iter()
                .map(|t| {
                    json!({
                        "id": t.id,
                        "title": t.title,
                        "category": t.category,
                        "mitigation": t.mitigation,
                        "mitigated": t.mitigated,
                    })
                })
                .collect();
            print_json(&json!({
                "phase": session.phase(),
                "degraded": outcome.is_degraded(),
                "threats": board,
                "score": session.security_score(),
                "remaining": session.remaining_count(),
            }));
        }

        Cmd::Toggle { id } => {
            session.set_phase(Phase::Mitigation);
            match session.toggle_mitigation(&id) {
                ToggleOutcome::UnknownThreat => {
                    let known: Vec<&str> = session.catalog().ids().collect();
                    anyhow::bail!("unknown threat id {id:?} (known: {})", known.join(", "));
                }
                ToggleOutcome::Toggled { mitigated, saved } => {
                    print_json(&json!({
                        "id": id,
                        "mitigated": mitigated,
                        "persisted": saved.is_ok(),
                        "score": session.security_score(),
                        "remaining": session.remaining_count(),
                    }));
                }
            }
        }

        Cmd::Score => {
            let secured: Vec<&str> = session.secured_links().into_iter().map(|l| l.label).collect();
            print_json(&json!({
                "posture": session.posture(),
                "secured_links": secured,
            }));
        }

        Cmd::Report => {
            session.set_phase(Phase::Reporting);
            print_json(&serde_json::to_value(session.report()).context("encode report")?);
        }

        // handled before the session is opened
        Cmd::Config { .. } | Cmd::Reset => {}
    }

    Ok(())
}

fn print_json(v: &Value) {
    println!("{}", serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string()));
}

fn handle_config(cmd: ConfigCmd) -> Result<()> {
    match cmd {
        ConfigCmd::Example => {
            print!("{}", config::EXAMPLE);
            Ok(())
        }
        ConfigCmd::Validate { path } => {
            let _ = Config::load(&path).with_context(|| format!("load {path:?}"))?;
            eprintln!("OK: {path:?}");
            Ok(())
        }
        ConfigCmd::Show { path } => {
            let txt = fs::read_to_string(&path).with_context(|| format!("read {path:?}"))?;
            print!("{txt}");
            Ok(())
        }
        ConfigCmd::Set { path, key, value } => set_config_value(&path, &key, &value),
        ConfigCmd::Unset { path, key } => unset_config_value(&path, &key),
    }
}

fn parse_toml_value(s: &str) -> toml_edit::Item {
    let t = s.trim();
    if matches!(t.to_lowercase().as_str(), "true" | "false") {
        return toml_edit::value(t.eq_ignore_ascii_case("true"));
    }
    if let Ok(i) = t.parse::<i64>() {
        return toml_edit::value(i);
    }
    if let Ok(f) = t.parse::<f64>() {
        return toml_edit::value(f);
    }
    toml_edit::value(t)
}

fn dotted_parts(dotted_key: &str) -> Result<Vec<&str>> {
    let parts: Vec<&str> = dotted_key.split('.').filter(|p| !p.is_empty()).collect();
    if parts.is_empty() {
        anyhow::bail!("invalid key");
    }
    Ok(parts)
}

fn read_document(path: &Path) -> Result<toml_edit::DocumentMut> {
    if !path.exists() {
        return Ok(toml_edit::DocumentMut::new());
    }
    let raw = fs::read_to_string(path).with_context(|| format!("read {path:?}"))?;
    raw.parse::<toml_edit::DocumentMut>().context("parse toml")
}

/// Validate by deserializing with the real config struct, then replace the file.
fn commit_document(path: &Path, doc: &toml_edit::DocumentMut) -> Result<()> {
    let new_txt = doc.to_string();
    let cfg: Config = toml::from_str(&new_txt).context("validate config")?;
    cfg.validate()?;
    write_atomic(path, &new_txt)
}

fn set_config_value(path: &Path, dotted_key: &str, value: &str) -> Result<()> {
    let mut doc = read_document(path)?;
    let parts = dotted_parts(dotted_key)?;
    let Some((last, parents)) = parts.split_last() else {
        anyhow::bail!("invalid key");
    };

    let mut cur: &mut toml_edit::Item = doc.as_item_mut();
    for p in parents {
        let table = cur
            .as_table_like_mut()
            .with_context(|| format!("{dotted_key}: parent of {p:?} is not a table"))?;
        let next = table.entry(p).or_insert(toml_edit::table());
        // Ensure intermediate tables.
        if !next.is_table_like() {
            *next = toml_edit::table();
        }
        cur = next;
    }

    let table = cur
        .as_table_like_mut()
        .with_context(|| format!("{dotted_key}: parent is not a table"))?;
    table.insert(last, parse_toml_value(value));

    commit_document(path, &doc)?;
    eprintln!("OK: set {dotted_key} in {path:?}");
    Ok(())
}

fn unset_config_value(path: &Path, dotted_key: &str) -> Result<()> {
    let mut doc = read_document(path)?;
    let parts = dotted_parts(dotted_key)?;
    let Some((last, parents)) = parts.split_last() else {
        anyhow::bail!("invalid key");
    };

    // Walk to parent; a missing section means there is nothing to remove.
    let mut cur: &mut toml_edit::Item = doc.as_item_mut();
    for p in parents {
        let Some(next) = cur.as_table_like_mut().and_then(|t| t.get_mut(p)) else {
            eprintln!("OK: {dotted_key} not set in {path:?}");
            return Ok(());
        };
        cur = next;
    }

    let removed = cur
        .as_table_like_mut()
        .and_then(|t| t.remove(last))
        .is_some();
    if !removed {
        eprintln!("OK: {dotted_key} not set in {path:?}");
        return Ok(());
    }

    commit_document(path, &doc)?;
    eprintln!("OK: unset {dotted_key} in {path:?}");
    Ok(())
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tf = tempfile::NamedTempFile::new_in(dir).context("create temp file")?;
    tf.write_all(contents.as_bytes()).context("write temp")?;
    tf.flush().context("flush temp")?;
    tf.persist(path).map_err(|e| anyhow::anyhow!(e)).context("persist")?;
    Ok(())
}
