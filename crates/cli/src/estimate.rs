//! `inciscope estimate | validate | resolve`: run the estimate engine from the shell.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use clap::Args;
use serde::Serialize;

use inciscope_estimate::model::{EstimateRequest, Reconstruction};
use inciscope_estimate::normalize::{normalize_name, split_declaration};
use inciscope_estimate::IdentityResolver;

use crate::context::{context_path, load_context};
use crate::CliError;

#[derive(Args)]
pub struct EstimateArgs {
    /// Profile category from the context (e.g. serum, cream, toner)
    #[arg(long, short = 'p')]
    profile: String,

    /// Formula context TOML file
    #[arg(long, env = "INCISCOPE_CONTEXT")]
    context: Option<PathBuf>,

    /// Declaration as one comma-separated string
    #[arg(long, short = 'i', conflicts_with = "file", required_unless_present = "file")]
    ingredients: Option<String>,

    /// Read the declaration from a file (or - for stdin)
    #[arg(long, short = 'f')]
    file: Option<PathBuf>,

    /// Known percentage, repeatable (e.g. --known Niacinamide=5)
    #[arg(long, value_name = "NAME=PCT")]
    known: Vec<String>,

    /// Override the context's base-diluent search budget
    #[arg(long)]
    rounds: Option<u32>,

    /// Output JSON to stdout instead of the table
    #[arg(long, conflicts_with = "csv")]
    json: bool,

    /// Output CSV to stdout instead of the table
    #[arg(long)]
    csv: bool,

    /// Write JSON output to file
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Formula context TOML file
    #[arg(long, env = "INCISCOPE_CONTEXT")]
    context: Option<PathBuf>,
}

#[derive(Args)]
pub struct ResolveArgs {
    /// Ingredient names to resolve
    #[arg(required = true)]
    names: Vec<String>,

    /// Formula context TOML file
    #[arg(long, env = "INCISCOPE_CONTEXT")]
    context: Option<PathBuf>,

    /// Output JSON to stdout
    #[arg(long)]
    json: bool,
}

// ---------------------------------------------------------------------------
// estimate
// ---------------------------------------------------------------------------

pub fn cmd_estimate(args: EstimateArgs) -> Result<(), CliError> {
    let mut context = load_context(&context_path(args.context)?)?;
    if let Some(rounds) = args.rounds {
        if rounds == 0 {
            return Err(CliError::usage("--rounds must be at least 1"));
        }
        context.settings.search_rounds = rounds;
    }

    let text = match (args.ingredients, args.file) {
        (Some(text), _) => text,
        (None, Some(path)) => read_declaration(&path)?,
        (None, None) => return Err(CliError::usage("pass --ingredients or --file")),
    };
    let names = split_declaration(&text);
    if names.is_empty() {
        log::warn!("declaration is empty");
    }

    let mut request = EstimateRequest::new(&args.profile, names);
    for arg in &args.known {
        let (name, pct) = parse_known(arg)?;
        request = request.with_known(&name, pct);
    }

    let result = inciscope_estimate::run(&context, &request).map_err(CliError::estimate)?;

    if let Some(ref path) = args.output {
        let json_str = to_json(&result)?;
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::io(format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if args.json {
        println!("{}", to_json(&result)?);
    } else if args.csv {
        write_csv(&result, std::io::stdout().lock())?;
    } else {
        print_table(&result);
    }

    // Human summary to stderr
    let s = &result.summary;
    eprintln!(
        "{} ingredients ({}): {} known, {} interpolated, {} below the 1% line, {} default usage, {} unresolved",
        s.total_slots,
        result.meta.profile,
        s.anchored,
        s.base + s.interpolated,
        s.sub_line,
        s.degraded,
        s.unresolved,
    );
    if let Some(base) = result.meta.base_value {
        eprintln!(
            "base: {base:.3}% after {} rounds (search error {:.4})",
            result.meta.search_rounds, result.meta.search_error
        );
    }

    Ok(())
}

fn read_declaration(path: &Path) -> Result<String, CliError> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|e| CliError::io(format!("cannot read stdin: {e}")))?;
        return Ok(text);
    }
    std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))
}

/// `NAME=PCT`, split at the last `=`. A trailing `%` is accepted.
fn parse_known(arg: &str) -> Result<(String, f64), CliError> {
    let malformed = || {
        CliError::usage(format!("invalid --known value: \"{arg}\""))
            .with_hint("expected NAME=PCT, e.g. --known 'Niacinamide=5'")
    };

    let (name, value) = arg.rsplit_once('=').ok_or_else(malformed)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(malformed());
    }
    let pct: f64 = value
        .trim()
        .trim_end_matches('%')
        .trim()
        .parse()
        .map_err(|_| malformed())?;
    Ok((name.to_string(), pct))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))
}

fn print_table(result: &Reconstruction) {
    let width = result
        .slots
        .iter()
        .map(|s| s.raw_name.chars().count())
        .max()
        .unwrap_or(0)
        .max("INGREDIENT".len());

    println!("{:>3}  {:<width$}  {:>8}  {:<12}  IDENTITY", "#", "INGREDIENT", "PERCENT", "SOURCE");
    for s in &result.slots {
        println!(
            "{:>3}  {:<width$}  {:>8.3}  {:<12}  {}",
            s.position + 1,
            s.raw_name,
            s.percentage,
            s.source.to_string(),
            s.identity.as_deref().unwrap_or("-"),
        );
    }
}

#[derive(Serialize)]
struct CsvRow<'a> {
    position: usize,
    name: &'a str,
    identity: Option<&'a str>,
    percentage: f64,
    source: String,
}

fn write_csv<W: Write>(result: &Reconstruction, out: W) -> Result<(), CliError> {
    let mut writer = csv::Writer::from_writer(out);
    for s in &result.slots {
        writer
            .serialize(CsvRow {
                position: s.position,
                name: &s.raw_name,
                identity: s.identity.as_deref(),
                percentage: s.percentage,
                source: s.source.to_string(),
            })
            .map_err(|e| CliError::io(format!("cannot write CSV: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| CliError::io(format!("cannot write CSV: {e}")))
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

pub fn cmd_validate(args: ValidateArgs) -> Result<(), CliError> {
    let context = load_context(&context_path(args.context)?)?;

    let mut profiles: Vec<&str> = context.profiles.keys().map(String::as_str).collect();
    profiles.sort_unstable();
    eprintln!(
        "valid: context '{}' with {} profile(s) [{}], {} marker(s), {} usage entr{}, {} alias(es)",
        context.name,
        profiles.len(),
        profiles.join(", "),
        context.markers.len(),
        context.usage.len(),
        if context.usage.len() == 1 { "y" } else { "ies" },
        context.aliases.len(),
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// resolve
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ResolveRow {
    name: String,
    normalized: String,
    /// Identity accepted at the context's match threshold.
    identity: Option<String>,
    /// Best candidate regardless of threshold.
    candidate: Option<String>,
    score: f64,
    method: inciscope_estimate::resolver::MatchMethod,
    marker: bool,
}

pub fn cmd_resolve(args: ResolveArgs) -> Result<(), CliError> {
    let context = load_context(&context_path(args.context)?)?;
    let resolver = context.resolver();
    let threshold = context.settings.match_threshold;

    let rows: Vec<ResolveRow> = args
        .names
        .iter()
        .map(|name| {
            let resolution = resolver.resolve(name);
            let identity = resolution.accepted(threshold).map(String::from);
            ResolveRow {
                name: name.clone(),
                normalized: normalize_name(name),
                marker: identity.as_deref().is_some_and(|id| context.is_marker(id)),
                identity,
                candidate: resolution.identity,
                score: resolution.score,
                method: resolution.method,
            }
        })
        .collect();

    if args.json {
        println!("{}", to_json(&rows)?);
        return Ok(());
    }

    for row in &rows {
        match (&row.identity, &row.candidate) {
            (Some(identity), _) => println!(
                "{} -> {identity} ({:?}, {:.1}){}",
                row.name,
                row.method,
                row.score,
                if row.marker { " [marker]" } else { "" },
            ),
            (None, Some(candidate)) => println!(
                "{} -> unresolved (closest: {candidate}, {:.1} < {threshold})",
                row.name, row.score
            ),
            (None, None) => println!("{} -> unresolved", row.name),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes::EXIT_USAGE;

    #[test]
    fn known_pairs_parse() {
        assert_eq!(parse_known("Niacinamide=5").unwrap(), ("Niacinamide".into(), 5.0));
        assert_eq!(parse_known(" Zinc PCA = 0.5% ").unwrap(), ("Zinc PCA".into(), 0.5));
        // split at the last '='
        assert_eq!(parse_known("A=B=2").unwrap(), ("A=B".into(), 2.0));
    }

    #[test]
    fn malformed_known_is_usage_error() {
        for bad in ["Niacinamide", "=5", "Niacinamide=five", "Niacinamide="] {
            let err = parse_known(bad).unwrap_err();
            assert_eq!(err.code, EXIT_USAGE, "{bad}");
            assert!(err.hint.is_some());
        }
    }

    #[test]
    fn csv_has_header_and_one_row_per_slot() {
        let context = inciscope_estimate::FormulaContext::from_toml(
            "name = \"t\"\ncatalog = [\"water\"]\nmarkers = [\"phenoxyethanol\"]\n[profiles.serum]\nbase_range = [60, 80]\n",
        )
        .unwrap();
        let request = EstimateRequest::new("serum", ["Water", "Glycerin", "Phenoxyethanol"]);
        let result = inciscope_estimate::run(&context, &request).unwrap();

        let mut out = Vec::new();
        write_csv(&result, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "position,name,identity,percentage,source");
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("0,water,water,"));
        assert!(lines[3].ends_with(",sub_line"));
    }
}
