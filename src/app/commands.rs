//! Inbound commands to the application service.
//!
//! These represent actions requested by the operator over the serial
//! console that the [`Console`](super::console::Console) interprets
//! against the [`MachineService`](super::service::MachineService).
//!
//! Grammar (one command per line, whitespace separated):
//!
//! ```text
//! make <cocktail> <ml>        shot <ingredient> <ml>     check <cocktail> <ml>
//! clean                       cancel                     flush <pump>
//! calibrate <pump>            measure <pump> <ml>
//! refill <ingredient> <ml>    refill all                 reset
//! level <ingredient> <ml> [capacity]                     capacity <ingredient> <ml>
//! bind <pump> <ingredient|->  levels  pumps  menu  stats  help
//! ```

use core::fmt;

use crate::pumps::PumpId;

/// Commands the console can send into the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum MachineCommand {
    Make { cocktail: String, size_ml: u32 },
    Shot { ingredient: String, size_ml: u32 },
    Check { cocktail: String, size_ml: u32 },
    Clean,
    /// Stop a running full cleaning cycle before its next pump.
    Cancel,
    Flush { pump: PumpId },
    Calibrate { pump: PumpId },
    Measure { pump: PumpId, measured_ml: f32 },
    Refill { ingredient: String, amount_ml: u32 },
    RefillAll,
    SetLevel {
        ingredient: String,
        amount_ml: u32,
        capacity_ml: Option<u32>,
    },
    SetCapacity { ingredient: String, capacity_ml: u32 },
    ResetLevels,
    /// `ingredient: None` disconnects the pump.
    Bind {
        pump: PumpId,
        ingredient: Option<String>,
    },
    Levels,
    Pumps,
    Menu,
    Stats,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Empty,
    UnknownCommand(String),
    MissingArgument(&'static str),
    InvalidNumber(String),
    TrailingInput(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty command"),
            Self::UnknownCommand(c) => write!(f, "unknown command '{c}' (try 'help')"),
            Self::MissingArgument(what) => write!(f, "missing argument: {what}"),
            Self::InvalidNumber(s) => write!(f, "not a number: '{s}'"),
            Self::TrailingInput(s) => write!(f, "unexpected '{s}'"),
        }
    }
}

impl std::error::Error for ParseError {}

impl MachineCommand {
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let mut args = Args(line.split_whitespace());
        let verb = args.0.next().ok_or(ParseError::Empty)?.to_ascii_lowercase();
        let cmd = match verb.as_str() {
            "make" => Self::Make {
                cocktail: args.word("cocktail")?,
                size_ml: args.number("size")?,
            },
            "shot" => Self::Shot {
                ingredient: args.word("ingredient")?,
                size_ml: args.number("size")?,
            },
            "check" => Self::Check {
                cocktail: args.word("cocktail")?,
                size_ml: args.number("size")?,
            },
            "clean" => Self::Clean,
            "cancel" => Self::Cancel,
            "flush" => Self::Flush {
                pump: args.number("pump")?,
            },
            "calibrate" => Self::Calibrate {
                pump: args.number("pump")?,
            },
            "measure" => Self::Measure {
                pump: args.number("pump")?,
                measured_ml: args.number("measured ml")?,
            },
            "refill" => match args.word("ingredient or 'all'")?.as_str() {
                "all" => Self::RefillAll,
                ingredient => Self::Refill {
                    ingredient: ingredient.to_string(),
                    amount_ml: args.number("amount")?,
                },
            },
            "level" => Self::SetLevel {
                ingredient: args.word("ingredient")?,
                amount_ml: args.number("amount")?,
                capacity_ml: args.optional_number()?,
            },
            "capacity" => Self::SetCapacity {
                ingredient: args.word("ingredient")?,
                capacity_ml: args.number("capacity")?,
            },
            "reset" => Self::ResetLevels,
            "bind" => {
                let pump = args.number("pump")?;
                let ingredient = args.word("ingredient or '-'")?;
                Self::Bind {
                    pump,
                    ingredient: (ingredient != "-").then_some(ingredient),
                }
            }
            "levels" => Self::Levels,
            "pumps" => Self::Pumps,
            "menu" => Self::Menu,
            "stats" => Self::Stats,
            "help" | "?" => Self::Help,
            other => return Err(ParseError::UnknownCommand(other.to_string())),
        };
        match args.0.next() {
            Some(extra) => Err(ParseError::TrailingInput(extra.to_string())),
            None => Ok(cmd),
        }
    }
}

struct Args<'a>(core::str::SplitWhitespace<'a>);

impl Args<'_> {
    fn word(&mut self, what: &'static str) -> Result<String, ParseError> {
        self.0
            .next()
            .map(str::to_string)
            .ok_or(ParseError::MissingArgument(what))
    }

    fn number<T: core::str::FromStr>(&mut self, what: &'static str) -> Result<T, ParseError> {
        let raw = self.0.next().ok_or(ParseError::MissingArgument(what))?;
        raw.parse().map_err(|_| ParseError::InvalidNumber(raw.to_string()))
    }

    fn optional_number<T: core::str::FromStr>(&mut self) -> Result<Option<T>, ParseError> {
        match self.0.next() {
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| ParseError::InvalidNumber(raw.to_string())),
            None => Ok(None),
        }
    }
}
