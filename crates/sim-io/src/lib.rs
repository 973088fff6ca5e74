#![deny(warnings)]

//! File formats around the engine: the plain-text scenario input, the
//! purchase log and the JSON run report.

use sim_core::{
    validate_scenario, Effect, ResourceId, ResourceTemplate, Scenario, TurnSpec, ValidationError,
};
use sim_runtime::RunSummary;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

/// Errors in the text of a scenario file.
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: String },
    #[error("line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        line: usize,
        expected: &'static str,
        found: usize,
    },
    #[error("line {line}: invalid {field} '{token}'")]
    InvalidField {
        line: usize,
        field: &'static str,
        token: String,
    },
    #[error("line {line}: {field} must be non-negative, got {value}")]
    Negative {
        line: usize,
        field: &'static str,
        value: i64,
    },
    #[error("line {line}: {source}")]
    Record {
        line: usize,
        source: ValidationError,
    },
    #[error("line {line}: unexpected input after the last turn")]
    TrailingInput { line: usize },
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Errors reading or writing files.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("{}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{}: {}", .path.display(), .source)]
    Parse { path: PathBuf, source: ParseError },
    #[error("{}: {}", .path.display(), .source)]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

struct Record<'a> {
    line: usize,
    fields: Vec<&'a str>,
}

impl Record<'_> {
    fn parse<T: FromStr>(&self, idx: usize, field: &'static str) -> Result<T, ParseError> {
        let token = self.fields[idx];
        token.parse().map_err(|_| ParseError::InvalidField {
            line: self.line,
            field,
            token: token.to_string(),
        })
    }

    fn count(&self, expected: &'static str, ok: bool) -> Result<(), ParseError> {
        if ok {
            Ok(())
        } else {
            Err(ParseError::FieldCount {
                line: self.line,
                expected,
                found: self.fields.len(),
            })
        }
    }

    fn non_negative(&self, idx: usize, field: &'static str) -> Result<u32, ParseError> {
        let value: i64 = self.parse(idx, field)?;
        u32::try_from(value).map_err(|_| {
            if value < 0 {
                ParseError::Negative {
                    line: self.line,
                    field,
                    value,
                }
            } else {
                ParseError::InvalidField {
                    line: self.line,
                    field,
                    token: value.to_string(),
                }
            }
        })
    }
}

fn next_record<'a, I>(lines: &mut I, expected: impl FnOnce() -> String) -> Result<Record<'a>, ParseError>
where
    I: Iterator<Item = Record<'a>>,
{
    lines
        .next()
        .ok_or_else(|| ParseError::UnexpectedEof { expected: expected() })
}

fn parse_resource(rec: &Record<'_>) -> Result<ResourceTemplate, ParseError> {
    rec.count("8 or 9", (8..=9).contains(&rec.fields.len()))?;
    let code_token = rec.fields[7];
    let mut chars = code_token.chars();
    let code = match (chars.next(), chars.next()) {
        (Some(c), None) => c,
        _ => {
            return Err(ParseError::InvalidField {
                line: rec.line,
                field: "RT",
                token: code_token.to_string(),
            })
        }
    };
    let magnitude = match rec.fields.len() {
        9 => Some(rec.parse(8, "RE")?),
        _ => None,
    };
    let effect = Effect::from_code(code, magnitude).map_err(|source| ParseError::Record {
        line: rec.line,
        source,
    })?;
    Ok(ResourceTemplate {
        id: ResourceId(rec.non_negative(0, "RI")?),
        activation_cost: rec.parse(1, "RA")?,
        maintenance_cost: rec.parse(2, "RP")?,
        active_turns: rec.non_negative(3, "RW")?,
        downtime_turns: rec.non_negative(4, "RM")?,
        lifetime: rec.non_negative(5, "RL")?,
        production_units: rec.non_negative(6, "RU")?,
        effect,
    })
}

fn parse_turn(rec: &Record<'_>) -> Result<TurnSpec, ParseError> {
    rec.count("3", rec.fields.len() == 3)?;
    Ok(TurnSpec {
        min_demand: rec.parse(0, "TM")?,
        max_capacity: rec.parse(1, "TX")?,
        unit_profit: rec.parse(2, "TR")?,
    })
}

/// Parse and validate a scenario in the plain-text input format:
///
/// ```text
/// D R T
/// RI RA RP RW RM RL RU RT [RE]   (R lines, RE present unless RT is X)
/// TM TX TR                       (T lines)
/// ```
///
/// Blank lines are ignored.
pub fn parse_scenario(text: &str) -> Result<Scenario, ParseError> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, l)| Record {
            line: i + 1,
            fields: l.split_whitespace().collect(),
        })
        .filter(|r| !r.fields.is_empty());

    let header = next_record(&mut lines, || "header 'D R T'".to_string())?;
    header.count("3", header.fields.len() == 3)?;
    let initial_budget: i64 = header.parse(0, "D")?;
    let n_resources: usize = header.parse(1, "R")?;
    let n_turns: usize = header.parse(2, "T")?;

    let mut resources = Vec::with_capacity(n_resources);
    for i in 0..n_resources {
        let rec = next_record(&mut lines, || format!("resource {} of {}", i + 1, n_resources))?;
        resources.push(parse_resource(&rec)?);
    }
    let mut turns = Vec::with_capacity(n_turns);
    for i in 0..n_turns {
        let rec = next_record(&mut lines, || format!("turn {} of {}", i + 1, n_turns))?;
        turns.push(parse_turn(&rec)?);
    }
    if let Some(extra) = lines.next() {
        return Err(ParseError::TrailingInput { line: extra.line });
    }

    let scenario = Scenario {
        initial_budget,
        resources,
        turns,
    };
    validate_scenario(&scenario)?;
    debug!(
        resources = scenario.resources.len(),
        turns = scenario.turns.len(),
        "scenario parsed"
    );
    Ok(scenario)
}

/// Render a scenario in the plain-text input format.
pub fn format_scenario(s: &Scenario) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {} {}", s.initial_budget, s.resources.len(), s.turns.len());
    for r in &s.resources {
        let _ = write!(
            out,
            "{} {} {} {} {} {} {} {}",
            r.id,
            r.activation_cost,
            r.maintenance_cost,
            r.active_turns,
            r.downtime_turns,
            r.lifetime,
            r.production_units,
            r.effect.code()
        );
        if let Some(m) = r.effect.magnitude() {
            let _ = write!(out, " {m}");
        }
        out.push('\n');
    }
    for t in &s.turns {
        let _ = writeln!(out, "{} {} {}", t.min_demand, t.max_capacity, t.unit_profit);
    }
    out
}

/// Load a scenario from disk. Files ending in `.json` hold a serialized
/// [`Scenario`]; anything else is read as the plain-text format.
pub fn load_scenario<P: AsRef<Path>>(path: P) -> Result<Scenario, IoError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| IoError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let is_json = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let scenario = if is_json {
        let s: Scenario = serde_json::from_str(&text).map_err(|source| IoError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        validate_scenario(&s).map_err(|e| IoError::Parse {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        s
    } else {
        parse_scenario(&text).map_err(|source| IoError::Parse {
            path: path.to_path_buf(),
            source,
        })?
    };
    info!(path = %path.display(), "scenario loaded");
    Ok(scenario)
}

/// One line per turn with purchases: `turn count id...`.
pub fn format_purchase_log<'a, I>(purchases: I) -> String
where
    I: IntoIterator<Item = (usize, &'a [ResourceId])>,
{
    let mut out = String::new();
    for (turn, ids) in purchases {
        if ids.is_empty() {
            continue;
        }
        let _ = write!(out, "{} {}", turn, ids.len());
        for id in ids {
            let _ = write!(out, " {id}");
        }
        out.push('\n');
    }
    out
}

fn write_file(path: &Path, contents: &str) -> Result<(), IoError> {
    std::fs::write(path, contents).map_err(|source| IoError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Write the purchase log of a finished run.
pub fn save_purchase_log<P: AsRef<Path>>(path: P, summary: &RunSummary) -> Result<(), IoError> {
    let path = path.as_ref();
    write_file(path, &format_purchase_log(summary.purchases()))?;
    info!(path = %path.display(), "purchase log written");
    Ok(())
}

/// Write the full run summary as pretty-printed JSON.
pub fn save_report<P: AsRef<Path>>(path: P, summary: &RunSummary) -> Result<(), IoError> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(summary).map_err(|source| IoError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    write_file(path, &json)?;
    info!(path = %path.display(), "report written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_ai::CheapestAffordable;
    use sim_core::SimConfig;

    const SAMPLE: &str = "\
1000 3 2
1 100 10 2 1 5 3 X
2 250 5 3 2 10 2 E 20

3 80 4 1 1 6 1 B -50
1 5 10
4 12 7
";

    #[test]
    fn parses_sample() {
        let s = parse_scenario(SAMPLE).unwrap();
        assert_eq!(s.initial_budget, 1000);
        assert_eq!(s.resources.len(), 3);
        assert_eq!(s.resources[0].effect, Effect::None);
        assert_eq!(s.resources[1].effect, Effect::Accumulator(20));
        assert_eq!(s.resources[2].effect, Effect::DemandBandMultiplier(-50));
        assert_eq!(
            s.turns[1],
            TurnSpec {
                min_demand: 4,
                max_capacity: 12,
                unit_profit: 7
            }
        );
    }

    #[test]
    fn format_then_parse_preserves_scenario() {
        let s = parse_scenario(SAMPLE).unwrap();
        assert_eq!(parse_scenario(&format_scenario(&s)).unwrap(), s);
    }

    #[test]
    fn missing_effect_magnitude_is_reported_on_its_line() {
        let text = "100 1 1\n1 10 1 1 1 3 1 C\n1 2 3\n";
        assert_eq!(
            parse_scenario(text),
            Err(ParseError::Record {
                line: 2,
                source: ValidationError::MissingEffectMagnitude('C')
            })
        );
    }

    #[test]
    fn negative_duration_is_rejected() {
        let text = "100 1 1\n1 10 1 -2 1 3 1 X\n1 2 3\n";
        assert_eq!(
            parse_scenario(text),
            Err(ParseError::Negative {
                line: 2,
                field: "RW",
                value: -2
            })
        );
    }

    #[test]
    fn truncated_input_is_rejected() {
        let err = parse_scenario("100 1 2\n1 10 1 1 1 3 1 X\n1 2 3\n").unwrap_err();
        assert_eq!(
            err,
            ParseError::UnexpectedEof {
                expected: "turn 2 of 2".to_string()
            }
        );
    }

    #[test]
    fn trailing_input_is_rejected() {
        let err = parse_scenario("100 0 1\n1 2 3\n4 5 6\n").unwrap_err();
        assert_eq!(err, ParseError::TrailingInput { line: 3 });
    }

    #[test]
    fn bad_tokens_are_rejected() {
        assert!(matches!(
            parse_scenario("100 1 0\n1 10 1 1 1 3 1 XY\n"),
            Err(ParseError::InvalidField { field: "RT", .. })
        ));
        assert!(matches!(
            parse_scenario("abc 0 0\n"),
            Err(ParseError::InvalidField { field: "D", .. })
        ));
        assert!(matches!(
            parse_scenario("100 1 0\n1 10 1 1 1 3 1 Z 4\n"),
            Err(ParseError::Record {
                source: ValidationError::UnknownEffectCode('Z'),
                ..
            })
        ));
    }

    #[test]
    fn catalog_validation_runs_after_parse() {
        let text = "100 2 0\n1 10 1 1 1 3 1 X\n1 20 1 1 1 3 1 X\n";
        assert_eq!(
            parse_scenario(text),
            Err(ParseError::Validation(ValidationError::DuplicateResource(
                ResourceId(1)
            )))
        );
    }

    #[test]
    fn purchase_log_skips_empty_turns() {
        let a = [ResourceId(3), ResourceId(1)];
        let b = [ResourceId(7)];
        let log = format_purchase_log(vec![(0, &a[..]), (1, &[][..]), (4, &b[..])]);
        assert_eq!(log, "0 2 3 1\n4 1 7\n");
    }

    #[test]
    fn files_roundtrip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.txt");
        std::fs::write(&input, SAMPLE).unwrap();
        let scenario = load_scenario(&input).unwrap();

        let json_path = dir.path().join("scenario.json");
        std::fs::write(&json_path, serde_json::to_string(&scenario).unwrap()).unwrap();
        assert_eq!(load_scenario(&json_path).unwrap(), scenario);

        let summary =
            sim_runtime::run_scenario(scenario, SimConfig::default(), &mut CheapestAffordable)
                .unwrap();
        let log_path = dir.path().join("output.txt");
        save_purchase_log(&log_path, &summary).unwrap();
        let log = std::fs::read_to_string(&log_path).unwrap();
        assert_eq!(log, "0 1 3\n1 1 3\n");

        let report_path = dir.path().join("report.json");
        save_report(&report_path, &summary).unwrap();
        let v: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
        assert_eq!(v["final_budget"], summary.final_budget);
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = load_scenario("/nonexistent/input.txt").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/input.txt"));
    }
}
