use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
    str::FromStr,
};

use abraham_patch_encoder::{build_patch_with, types::DEFAULT_EDIT_COST, Patch, PatchConfig, PayloadEncoding};
use abraham_types::parse_selector;
use abraham_verifier::{
    apply_patch, check_call, decode_hex, decode_patch, utils::address::parse_address,
    Authorization, CandidateCall, LedgerEntry, MemoryQuotaStore, Rejection, TierAGate, TierAPolicy,
};
use alloy_primitives::{Address, U256};
use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use time::{
    format_description::well_known::{Iso8601, Rfc3339},
    Date, OffsetDateTime,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Build and replay Abraham prompt patches, and check sponsored calls against a Tier-A policy.
#[derive(Parser, Debug)]
#[command(name = "abraham", author, version, about)]
struct Cli {
    /// Log filter used when `RUST_LOG` is not set (eg `debug`, `abraham_verifier=trace`).
    #[arg(long, global = true, env = "ABRAHAM_LOG", default_value = "warn")]
    log: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Diff two prompt files and print the encoded patch.
    Patch(PatchArgs),
    /// Replay an encoded patch against the old prompt and print the result.
    Apply(ApplyArgs),
    /// Evaluate a candidate call against a policy file.
    Check(CheckArgs),
}

#[derive(Args, Debug)]
struct PatchArgs {
    /// File holding the current prompt.
    #[arg(long)]
    old: PathBuf,

    /// File holding the edited prompt.
    #[arg(long)]
    new: PathBuf,

    /// Allow characters above U+00FF in inserts (written as two-byte `InsertWide` runs).
    #[arg(long)]
    wide: bool,

    /// Edit cost for the efficiency cleanup; 0 keeps the minimal diff.
    #[arg(long, default_value_t = DEFAULT_EDIT_COST)]
    edit_cost: usize,

    /// Refuse inputs longer than this many UTF-16 code units.
    #[arg(long, env = "ABRAHAM_MAX_CHARS", default_value_t = 100_000)]
    max_chars: usize,

    /// Also write a JSON report here (eg, patch.report.json).
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ApplyArgs {
    /// File holding the current prompt.
    #[arg(long)]
    old: PathBuf,

    /// Patch as hex (`0x...`), or `@path` to read the hex from a file.
    #[arg(long)]
    patch: String,
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// Tier-A policy JSON file.
    #[arg(long, env = "ABRAHAM_POLICY")]
    policy: PathBuf,

    /// Target contract address.
    #[arg(long)]
    to: String,

    /// Function selector as hex (`0x12345678`) or signature (`praise(uint256)`).
    #[arg(long)]
    selector: String,

    /// Value in wei, decimal or `0x` hex.
    #[arg(long, default_value = "0")]
    value: String,

    /// Sponsored user; when set, the call also goes through the daily quota.
    #[arg(long)]
    user: Option<String>,

    /// Unix timestamp to evaluate the quota at. Defaults to now.
    #[arg(long)]
    now: Option<i64>,

    /// Daily spend ledger read before and written after a `--user` check.
    #[arg(long, env = "ABRAHAM_QUOTA_LEDGER", default_value = "quota-ledger.json")]
    ledger: PathBuf,
}

/// On-disk form of the daily quota ledger.
#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<String>,
    #[serde(default)]
    entries: Vec<LedgerRow>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LedgerRow {
    user: Address,
    /// UTC calendar day, `YYYY-MM-DD`.
    day: String,
    spent_wei: U256,
}

fn main() -> Result<ExitCode> {
    // A missing .env is fine; flags and the environment still apply.
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log);

    match cli.command {
        Command::Patch(args) => run_patch(&args),
        Command::Apply(args) => run_apply(&args),
        Command::Check(args) => run_check(&args),
    }
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run_patch(args: &PatchArgs) -> Result<ExitCode> {
    let old = read_text(&args.old)?;
    let new = read_text(&args.new)?;

    let config = PatchConfig {
        payload: if args.wide { PayloadEncoding::Wide } else { PayloadEncoding::Latin1 },
        edit_cost: args.edit_cost,
        max_chars: Some(args.max_chars),
    };
    let patch = build_patch_with(&config, &old, &new)
        .with_context(|| format!("failed encoding {} -> {}", args.old.display(), args.new.display()))?;
    info!(bytes = patch.encoded.len(), changed = patch.changed_count, "patch built");

    println!("{}", patch.to_hex());
    println!("changed: {}", patch.changed_count);

    if let Some(ref path) = args.report {
        write_json_atomic(path, &patch_report(args, &config, &patch)?)?;
        debug!(path = %path.display(), "report written");
    }
    Ok(ExitCode::SUCCESS)
}

fn patch_report(args: &PatchArgs, config: &PatchConfig, patch: &Patch) -> Result<Value> {
    let ops = decode_patch(&patch.encoded).context("failed re-reading encoded patch")?;
    let now = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string());

    Ok(json!({
        "generated_at": now,
        "old": args.old.display().to_string(),
        "new": args.new.display().to_string(),
        "payload": match config.payload {
            PayloadEncoding::Latin1 => "latin1",
            PayloadEncoding::Wide => "wide",
        },
        "edit_cost": config.edit_cost,
        "patch": patch.to_hex(),
        "bytes": patch.encoded.len(),
        "ops": ops.len(),
        "changed_count": patch.changed_count,
    }))
}

fn run_apply(args: &ApplyArgs) -> Result<ExitCode> {
    let old = read_text(&args.old)?;

    let hex_text = match args.patch.strip_prefix('@') {
        Some(path) => fs::read_to_string(path).with_context(|| format!("failed reading {path}"))?,
        None => args.patch.clone(),
    };
    let bytes = decode_hex(&hex_text).context("failed parsing patch hex")?;
    let ops = decode_patch(&bytes).context("failed decoding patch")?;
    let text = apply_patch(&old, &ops)
        .with_context(|| format!("patch does not apply to {}", args.old.display()))?;

    print!("{text}");
    Ok(ExitCode::SUCCESS)
}

fn run_check(args: &CheckArgs) -> Result<ExitCode> {
    let raw = fs::read_to_string(&args.policy)
        .with_context(|| format!("failed reading {}", args.policy.display()))?;
    let policy: TierAPolicy = serde_json::from_str(&raw)
        .with_context(|| format!("failed parsing policy JSON in {}", args.policy.display()))?;

    let to = parse_address(&args.to).with_context(|| format!("invalid --to {}", args.to))?;
    let selector = parse_selector(&args.selector)
        .with_context(|| format!("invalid --selector {}", args.selector))?;
    let value = U256::from_str(args.value.trim())
        .map_err(|e| anyhow!("invalid --value {}: {e}", args.value))?;
    let call = CandidateCall::new(to, selector, value);

    let mut verdict = json!({
        "chainId": policy.chain_id,
        "to": to,
        "selector": selector,
        "valueWei": value,
    });

    let allowed = match args.user {
        Some(ref user) => {
            let user: Address =
                parse_address(user).with_context(|| format!("invalid --user {user}"))?;
            let now = args.now.unwrap_or_else(|| OffsetDateTime::now_utc().unix_timestamp());
            match authorize_with_ledger(&policy, &args.ledger, user, &call, now)? {
                Ok(auth) => {
                    verdict["ruleIndex"] = json!(auth.rule_index);
                    if let Some(receipt) = auth.quota {
                        verdict["quota"] = json!({
                            "spentToday": receipt.spent_today,
                            "remaining": receipt.remaining,
                        });
                    }
                    true
                }
                Err(rejection) => {
                    verdict["reason"] = json!(rejection.to_string());
                    verdict["status"] = json!(rejection.http_status());
                    false
                }
            }
        }
        None => match check_call(&policy, &call) {
            Ok((index, rule)) => {
                verdict["ruleIndex"] = json!(index);
                verdict["maxWeiPerTx"] = json!(rule.max_wei_per_tx);
                true
            }
            Err(violation) => {
                verdict["reason"] = json!(violation.to_string());
                verdict["status"] = json!(403);
                false
            }
        },
    };
    verdict["allowed"] = json!(allowed);

    println!(
        "{}",
        serde_json::to_string_pretty(&verdict).context("failed serialising verdict")?
    );
    Ok(if allowed { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Run the gate against the ledger at `path`, saving it again when the call is authorised.
fn authorize_with_ledger(
    policy: &TierAPolicy,
    path: &Path,
    user: Address,
    call: &CandidateCall,
    now: i64,
) -> Result<Result<Authorization, Rejection>> {
    let store = load_ledger(path)?;
    let outcome = TierAGate::new(policy, &store).authorize(user, call, now);
    if matches!(outcome, Ok(Authorization { quota: Some(_), .. })) {
        store.prune(now).context("failed pruning quota ledger")?;
        save_ledger(path, &store)?;
        debug!(path = %path.display(), "quota ledger updated");
    }
    Ok(outcome)
}

fn load_ledger(path: &Path) -> Result<MemoryQuotaStore> {
    if !path.exists() {
        return Ok(MemoryQuotaStore::new());
    }
    let raw = fs::read_to_string(path).with_context(|| format!("failed reading {}", path.display()))?;
    if raw.trim().is_empty() {
        return Ok(MemoryQuotaStore::new());
    }
    let file: LedgerFile = serde_json::from_str(&raw)
        .with_context(|| format!("failed parsing ledger JSON in {}", path.display()))?;

    let entries = file
        .entries
        .into_iter()
        .map(|row| {
            let day = Date::parse(&row.day, &Iso8601::DATE)
                .with_context(|| format!("invalid ledger day {}", row.day))?;
            Ok(LedgerEntry { user: row.user, day, spent: row.spent_wei })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(MemoryQuotaStore::from_entries(entries))
}

fn save_ledger(path: &Path, store: &MemoryQuotaStore) -> Result<()> {
    let mut entries = store.entries();
    entries.sort_by_key(|e| (e.day, e.user));
    let rows = entries
        .into_iter()
        .map(|e| {
            let day = e.day.format(&Iso8601::DATE).context("failed formatting ledger day")?;
            Ok(LedgerRow { user: e.user, day, spent_wei: e.spent })
        })
        .collect::<Result<Vec<_>>>()?;

    let file = LedgerFile {
        updated_at: OffsetDateTime::now_utc().format(&Rfc3339).ok(),
        entries: rows,
    };
    let value = serde_json::to_value(&file).context("failed serialising quota ledger")?;
    write_json_atomic(path, &value)
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed reading {}", path.display()))
}

fn write_json_atomic(path: &Path, value: &Value) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !parent.exists() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed creating directory {}", parent.display()))?;
    }

    let serialised = serde_json::to_string_pretty(value).context("failed serialising report JSON")?;
    let tmp_path = tmp_path_for(path);
    fs::write(&tmp_path, serialised.as_bytes())
        .with_context(|| format!("failed writing temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("failed replacing {}", path.display()))?;
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from([
            "abraham", "patch", "--old", "a.txt", "--new", "b.txt", "--wide", "--report", "r.json",
        ])
        .unwrap();
        match cli.command {
            Command::Patch(args) => {
                assert!(args.wide);
                assert_eq!(args.edit_cost, DEFAULT_EDIT_COST);
                assert_eq!(args.report, Some(PathBuf::from("r.json")));
            }
            other => panic!("unexpected command {other:?}"),
        }

        let cli = Cli::try_parse_from([
            "abraham", "check", "--policy", "p.json", "--to", "0xaa", "--selector", "0x12345678",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Check(ref a) if a.value == "0" && a.user.is_none()));
    }

    fn temp_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("abraham-cli-{tag}-{}", std::process::id()))
    }

    #[test]
    fn ledger_carries_spend_between_runs() {
        let policy: TierAPolicy = serde_json::from_str(
            r#"{
                "chainId": 8453,
                "allow": [{ "to": "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "selectors": "*", "maxWeiPerTx": "100" }],
                "dailyCapWei": "150"
            }"#,
        )
        .unwrap();
        let to = parse_address("0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa").unwrap();
        let user = parse_address("0x00000000000000000000000000000000000a11ce").unwrap();
        let call = CandidateCall::new(to, parse_selector("0x12345678").unwrap(), U256::from(100u64));
        // 2024-03-01T12:00:00Z
        let noon = 1_709_294_400;

        let dir = temp_dir("ledger");
        let ledger = dir.join("quota.json");

        let first = authorize_with_ledger(&policy, &ledger, user, &call, noon).unwrap();
        assert_eq!(first.unwrap().quota.map(|q| q.remaining), Some(U256::from(50u64)));

        let saved: Value = serde_json::from_str(&fs::read_to_string(&ledger).unwrap()).unwrap();
        assert_eq!(saved["entries"][0]["day"], "2024-03-01");

        let second = authorize_with_ledger(&policy, &ledger, user, &call, noon + 60).unwrap();
        let rejection = second.unwrap_err();
        assert_eq!(rejection.http_status(), 403);

        // Next day the ledger no longer counts yesterday's spend.
        let next_day = authorize_with_ledger(&policy, &ledger, user, &call, noon + 86_400).unwrap();
        assert!(next_day.is_ok());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn tmp_path_appends_suffix() {
        assert_eq!(tmp_path_for(Path::new("out/report.json")), PathBuf::from("out/report.json.tmp"));
    }

    #[test]
    fn report_is_written_atomically() {
        let dir = temp_dir("report");
        let path = dir.join("nested").join("report.json");
        write_json_atomic(&path, &json!({ "changed_count": 3 })).unwrap();

        let back: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back["changed_count"], 3);
        assert!(!tmp_path_for(&path).exists());
        fs::remove_dir_all(&dir).unwrap();
    }
}
