use std::str::FromStr;

use anyhow::{bail, Context};
use clap::Parser;
use rigquad_core::{Ball, Mag, Options, QueueDiscipline};

use crate::catalogue;

/// Which catalogue entries to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    All,
    One(usize),
}

impl Selection {
    pub fn indices(self) -> std::ops::RangeInclusive<usize> {
        match self {
            Selection::All => 0..=catalogue::ENTRIES.len() - 1,
            Selection::One(n) => n..=n,
        }
    }
}

impl FromStr for Selection {
    type Err = String;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        if text == "all" {
            return Ok(Selection::All);
        }
        let n: usize = text
            .parse()
            .map_err(|_| format!("expected an integral number or \"all\", got \"{text}\""))?;
        if n >= catalogue::ENTRIES.len() {
            return Err(format!(
                "integral {n} does not exist (0 <= n <= {})",
                catalogue::ENTRIES.len() - 1
            ));
        }
        Ok(Selection::One(n))
    }
}

#[derive(Debug, Parser)]
#[command(name = "integrals", disable_help_flag = true, disable_version_flag = true)]
pub struct Cli {
    /// Integral to compute, or "all"
    #[arg(short = 'i', value_name = "N")]
    pub integral: Option<Selection>,

    /// Precision in bits
    #[arg(long, default_value_t = 64)]
    pub prec: u32,

    /// Relative accuracy goal in bits (default: prec)
    #[arg(long, allow_hyphen_values = true)]
    pub goal: Option<i64>,

    /// Absolute error goal as a decimal literal (default: 2^-prec)
    #[arg(long, allow_hyphen_values = true)]
    pub tol: Option<String>,

    #[arg(long)]
    pub twice: bool,

    #[arg(long)]
    pub heap: bool,

    #[arg(long)]
    pub verbose: bool,

    #[arg(long)]
    pub verbose2: bool,

    #[arg(long)]
    pub deg: Option<usize>,

    #[arg(long)]
    pub eval: Option<usize>,

    #[arg(long)]
    pub depth: Option<usize>,

    #[arg(short = 'h', long)]
    pub help: bool,
}

/// Everything a catalogue entry needs to run.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub prec: u32,
    pub goal: u32,
    pub tol: Mag,
    pub options: Options,
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        if self.verbose2 {
            2
        } else if self.verbose {
            1
        } else {
            0
        }
    }

    pub fn settings(&self) -> anyhow::Result<RunSettings> {
        if self.prec == 0 {
            bail!("expected prec >= 1");
        }
        let goal = match self.goal {
            None => self.prec,
            Some(goal) if goal < 0 => bail!("expected goal >= 0"),
            Some(goal) => u32::try_from(goal).context("goal is too large")?,
        };
        let tol = match &self.tol {
            None => Mag::two_pow(-i64::from(self.prec)),
            Some(text) => Ball::from_decimal_str(text, self.prec.max(64))
                .with_context(|| format!("invalid tolerance \"{text}\""))?
                .mag(),
        };
        let options = Options {
            deg_limit: self.deg.unwrap_or(0),
            eval_limit: self.eval.unwrap_or(0),
            depth_limit: self.depth.unwrap_or(0),
            discipline: if self.heap {
                QueueDiscipline::Heap
            } else {
                QueueDiscipline::Stack
            },
            verbose: self.verbosity(),
        };
        Ok(RunSettings {
            prec: self.prec,
            goal,
            tol,
            options,
        })
    }
}

/// Rewrites single-dash long flags (`-prec`) to the double-dash form clap
/// expects. Short flags and negative numbers pass through.
pub fn normalize_args<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    args.into_iter()
        .enumerate()
        .map(|(index, arg)| {
            let is_long = arg.len() > 2
                && arg.starts_with('-')
                && !arg.starts_with("--")
                && arg[1..].starts_with(|c: char| c.is_ascii_alphabetic());
            if index > 0 && is_long {
                format!("-{arg}")
            } else {
                arg
            }
        })
        .collect()
}

pub fn usage() -> String {
    let last = catalogue::ENTRIES.len() - 1;
    let mut text = String::new();
    text.push_str("Compute integrals with rigorous error bounds.\n");
    text.push_str("Usage: integrals -i n [-prec p] [-tol eps] [-twice] [...]\n\n");
    text.push_str(&format!(
        "-i n       - compute integral n (0 <= n <= {last}), or \"-i all\"\n"
    ));
    text.push_str("-prec p    - precision in bits (default p = 64)\n");
    text.push_str("-goal p    - approximate relative accuracy goal (default p)\n");
    text.push_str("-tol eps   - approximate absolute error goal (default 2^-p)\n");
    text.push_str("-twice     - run twice (to see overhead of computing nodes)\n");
    text.push_str("-heap      - use heap for subinterval queue\n");
    text.push_str("-verbose   - show information\n");
    text.push_str("-verbose2  - show more information\n");
    text.push_str("-deg n     - use quadrature degree up to n\n");
    text.push_str("-eval n    - limit number of function evaluations to n\n");
    text.push_str("-depth n   - limit subinterval depth to n\n\n");
    text.push_str("Implemented integrals:\n");
    for (index, entry) in catalogue::ENTRIES.iter().enumerate() {
        text.push_str(&format!("I{index} = {}\n", entry.description));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<Cli> {
        let args = normalize_args(args.iter().map(|s| s.to_string()));
        Ok(Cli::try_parse_from(args)?)
    }

    fn assert_err_contains<T: std::fmt::Debug>(result: anyhow::Result<T>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err:#}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    #[test]
    fn single_dash_long_flags_are_normalized() {
        let args = normalize_args(
            ["integrals", "-i", "3", "-prec", "128", "--heap", "-goal", "-1"]
                .iter()
                .map(|s| s.to_string()),
        );
        assert_eq!(
            args,
            vec!["integrals", "-i", "3", "--prec", "128", "--heap", "--goal", "-1"]
        );
    }

    #[test]
    fn defaults_follow_precision() {
        let cli = parse(&["integrals", "-i", "all", "-prec", "128"]).expect("valid arguments");
        assert_eq!(cli.integral, Some(Selection::All));
        let settings = cli.settings().expect("valid settings");
        assert_eq!(settings.goal, 128);
        assert_eq!(settings.tol, Mag::two_pow(-128));
        assert_eq!(settings.options.discipline, QueueDiscipline::Stack);
        assert_eq!(settings.options.verbose, 0);
    }

    #[test]
    fn flags_map_onto_options() {
        let cli = parse(&[
            "integrals", "-i", "8", "-heap", "-eval", "5000", "-depth", "40", "-deg", "30",
            "-verbose2", "-tol", "1e-10",
        ])
        .expect("valid arguments");
        let settings = cli.settings().expect("valid settings");
        assert_eq!(settings.options.discipline, QueueDiscipline::Heap);
        assert_eq!(settings.options.eval_limit, 5000);
        assert_eq!(settings.options.depth_limit, 40);
        assert_eq!(settings.options.deg_limit, 30);
        assert_eq!(settings.options.verbose, 2);
        let tol = settings.tol.to_f64();
        assert!(tol > 0.999_999e-10 && tol < 1.001e-10);
    }

    #[test]
    fn negative_goal_is_rejected() {
        let cli = parse(&["integrals", "-i", "0", "-goal", "-5"]).expect("parses");
        assert_err_contains(cli.settings(), "expected goal >= 0");
    }

    #[test]
    fn bad_selection_and_tolerance_are_errors() {
        assert_err_contains(parse(&["integrals", "-i", "99"]), "does not exist");
        assert_err_contains(parse(&["integrals", "-i", "x"]), "expected an integral number");
        let cli = parse(&["integrals", "-i", "0", "-tol", "abc"]).expect("parses");
        assert_err_contains(cli.settings(), "invalid tolerance");
    }

    #[test]
    fn selection_ranges() {
        assert_eq!(Selection::One(4).indices(), 4..=4);
        assert_eq!(Selection::All.indices().count(), catalogue::ENTRIES.len());
        assert!(usage().contains("I19 = "));
    }
}
