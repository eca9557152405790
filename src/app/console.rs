//! Serial console: turns operator lines into service calls.
//!
//! The console owns the driven adapters the service needs per call (pump
//! actuator, delay, event sink, usage tally) plus the recipe catalog, and
//! renders every outcome as plain reply lines.
//!
//! ```text
//!  UART line ──▶ MachineCommand::parse ──▶ Console::execute ──▶ MachineService
//!                                                │
//!                                                └──▶ reply lines ──▶ UART
//! ```

use core::fmt;

use embedded_hal::delay::DelayNs;

use crate::adapters::usage::UsageTally;
use crate::catalog::Catalog;
use crate::error::Error;
use crate::sequencer::dispense::{DispenseFailure, DispenseReport};

use super::commands::{MachineCommand, ParseError};
use super::ports::{ActuatorPort, EventSink, LevelStore, PumpStore, StoragePort, TimePort};
use super::service::MachineService;

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleError {
    Parse(ParseError),
    UnknownCocktail(String),
    Dispense(DispenseFailure),
    Engine(Error),
}

impl fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "{e}"),
            Self::UnknownCocktail(id) => write!(f, "unknown cocktail '{id}' (try 'menu')"),
            Self::Dispense(e) => write!(f, "{e}"),
            Self::Engine(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ConsoleError {}

impl From<ParseError> for ConsoleError {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

impl From<DispenseFailure> for ConsoleError {
    fn from(e: DispenseFailure) -> Self {
        Self::Dispense(e)
    }
}

impl From<Error> for ConsoleError {
    fn from(e: Error) -> Self {
        Self::Engine(e)
    }
}

const HELP: &[&str] = &[
    "make <cocktail> <ml> | shot <ingredient> <ml> | check <cocktail> <ml>",
    "clean | cancel | flush <pump> | calibrate <pump> | measure <pump> <ml>",
    "refill <ingredient> <ml> | refill all | reset",
    "level <ingredient> <ml> [capacity] | capacity <ingredient> <ml>",
    "bind <pump> <ingredient|-> | levels | pumps | menu | stats",
];

pub struct Console<A, D, E, St, Cl>
where
    A: ActuatorPort,
    D: DelayNs,
    E: EventSink,
    St: StoragePort,
    Cl: TimePort,
{
    catalog: Catalog,
    actuator: A,
    delay: D,
    sink: E,
    usage: UsageTally<St, Cl>,
}

impl<A, D, E, St, Cl> Console<A, D, E, St, Cl>
where
    A: ActuatorPort,
    D: DelayNs,
    E: EventSink,
    St: StoragePort,
    Cl: TimePort,
{
    pub fn new(catalog: Catalog, actuator: A, delay: D, sink: E, usage: UsageTally<St, Cl>) -> Self {
        Self {
            catalog,
            actuator,
            delay,
            sink,
            usage,
        }
    }

    /// Parse and run one line; errors become a single `ERR` line.
    pub fn handle_line<S: LevelStore, C: TimePort, P: PumpStore>(
        &mut self,
        svc: &mut MachineService<S, C, P>,
        line: &str,
    ) -> Vec<String> {
        let result = MachineCommand::parse(line)
            .map_err(ConsoleError::from)
            .and_then(|cmd| self.execute(svc, cmd));
        match result {
            Ok(lines) => lines,
            Err(e) => vec![format!("ERR {e}")],
        }
    }

    pub fn execute<S: LevelStore, C: TimePort, P: PumpStore>(
        &mut self,
        svc: &mut MachineService<S, C, P>,
        cmd: MachineCommand,
    ) -> Result<Vec<String>, ConsoleError> {
        let lines = match cmd {
            MachineCommand::Make { cocktail, size_ml } => {
                let recipe = self
                    .catalog
                    .cocktail(&cocktail)
                    .ok_or_else(|| ConsoleError::UnknownCocktail(cocktail.clone()))?;
                let report = svc.make_cocktail(
                    recipe,
                    size_ml,
                    &mut self.actuator,
                    &mut self.sink,
                    &mut self.usage,
                )?;
                self.poured(&report)
            }
            MachineCommand::Shot { ingredient, size_ml } => {
                let report = svc.make_shot(&ingredient, size_ml, &mut self.actuator, &mut self.sink)?;
                self.poured(&report)
            }
            MachineCommand::Check { cocktail, size_ml } => {
                let recipe = self
                    .catalog
                    .cocktail(&cocktail)
                    .ok_or_else(|| ConsoleError::UnknownCocktail(cocktail.clone()))?;
                let report = svc.check_cocktail(recipe, size_ml)?;
                let mut lines = vec![if report.is_available() {
                    format!("OK {} {}ml available", recipe.name, size_ml)
                } else {
                    format!("NO {} {}ml unavailable", recipe.name, size_ml)
                }];
                lines.extend(report.missing_bindings.iter().map(|id| format!("  no pump: {id}")));
                lines.extend(report.insufficient.iter().map(|id| format!("  too low: {id}")));
                lines
            }
            MachineCommand::Clean => {
                let report = svc.clean_all(&mut self.actuator, &mut self.delay, &mut self.sink)?;
                let mut lines = vec![format!(
                    "OK cleaning {}: {} flushed, {} failed",
                    if report.cancelled { "cancelled" } else { "complete" },
                    report.flushed.len(),
                    report.failed.len()
                )];
                lines.extend(
                    report
                        .failed
                        .iter()
                        .map(|(pump, e)| format!("  pump {pump}: {e}")),
                );
                lines
            }
            MachineCommand::Cancel => {
                svc.cancel_token().cancel();
                vec!["OK cancel requested".to_string()]
            }
            MachineCommand::Flush { pump } => {
                svc.clean_pump(pump, &mut self.actuator, &mut self.sink)?;
                vec![format!("OK pump {pump} flushed")]
            }
            MachineCommand::Calibrate { pump } => {
                let session = svc.begin_calibration(pump, &mut self.actuator, &mut self.sink)?;
                vec![format!(
                    "OK pump {} ran {} ms, now 'measure {} <ml>'",
                    session.pump, session.reference_ms, session.pump
                )]
            }
            MachineCommand::Measure { pump, measured_ml } => {
                let rate = svc.finish_calibration(pump, measured_ml, &mut self.sink)?;
                vec![format!("OK pump {pump} flow {rate:.2} mL/s")]
            }
            MachineCommand::Refill {
                ingredient,
                amount_ml,
            } => {
                let level = svc.refill(&ingredient, amount_ml)?;
                vec![format!(
                    "OK {} {}/{} ml",
                    level.ingredient_id, level.current_ml, level.capacity_ml
                )]
            }
            MachineCommand::RefillAll => {
                svc.refill_all(&mut self.sink);
                vec!["OK all ingredients refilled".to_string()]
            }
            MachineCommand::SetLevel {
                ingredient,
                amount_ml,
                capacity_ml,
            } => {
                let level = svc.set_level(&ingredient, amount_ml, capacity_ml);
                vec![format!(
                    "OK {} {}/{} ml",
                    level.ingredient_id, level.current_ml, level.capacity_ml
                )]
            }
            MachineCommand::SetCapacity {
                ingredient,
                capacity_ml,
            } => {
                let level = svc.set_capacity(&ingredient, capacity_ml);
                vec![format!(
                    "OK {} {}/{} ml",
                    level.ingredient_id, level.current_ml, level.capacity_ml
                )]
            }
            MachineCommand::ResetLevels => {
                svc.reset_levels(&mut self.sink);
                vec!["OK levels reset".to_string()]
            }
            MachineCommand::Bind { pump, ingredient } => {
                let what = ingredient.clone().unwrap_or_else(|| "nothing".to_string());
                svc.rebind_pump(pump, ingredient)?;
                vec![format!("OK pump {pump} -> {what}")]
            }
            MachineCommand::Levels => svc
                .levels()
                .map(|l| format!("{:<20} {:>5}/{:<5} ml", l.ingredient_id, l.current_ml, l.capacity_ml))
                .collect(),
            MachineCommand::Pumps => svc
                .registry()
                .pumps()
                .iter()
                .map(|p| {
                    format!(
                        "pump {:>2} ch{:<2} {:>6.2} mL/s {}",
                        p.id,
                        p.channel,
                        p.flow_rate_ml_s,
                        p.ingredient.as_deref().unwrap_or("-")
                    )
                })
                .collect(),
            MachineCommand::Menu => self
                .catalog
                .cocktails()
                .iter()
                .map(|c| format!("{:<16} {}", c.id, c.name))
                .collect(),
            MachineCommand::Stats => {
                let totals = self.usage.totals();
                let mut lines = vec![format!(
                    "{} poured, {} different, favourite: {}",
                    totals.total,
                    totals.unique,
                    totals.most_popular.map_or_else(|| "-".to_string(), |s| s.name)
                )];
                lines.extend(
                    self.usage
                        .stats()
                        .iter()
                        .map(|s| format!("{:>4}x {}", s.count, s.name)),
                );
                lines
            }
            MachineCommand::Help => HELP.iter().map(|s| s.to_string()).collect(),
        };
        Ok(lines)
    }

    fn poured(&self, report: &DispenseReport) -> Vec<String> {
        let mut lines = vec![format!("OK {}", report.status)];
        for item in report.recipe.manual() {
            let name = self
                .catalog
                .ingredient(&item.ingredient_id)
                .map_or(item.ingredient_id.as_str(), |i| i.name.as_str());
            let how = item.instruction.as_deref().unwrap_or("add by hand");
            lines.push(format!("  then {}ml {}: {}", item.amount_ml, name, how));
        }
        lines
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn usage(&self) -> &UsageTally<St, Cl> {
        &self.usage
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn sink(&self) -> &E {
        &self.sink
    }
}
