// ═══════════════════════════════════════════════════════════════════════
// Human Agent — line-oriented console play.
//
// Each action phase prints the faction's units and a numbered list of the
// legal actions, then reads commands one line at a time:
//
//   3 7 12    queue actions by number (spaces or commas)
//   undo      drop the last queued action
//   list      print the menu again
//   done      submit the queue (also: empty line, `pass`, end of input)
// ═══════════════════════════════════════════════════════════════════════

use crate::agent::Agent;
use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};
use tgcsm_engine::types::*;
use tgcsm_engine::visibility::GameStateView;
use tracing::warn;

pub struct HumanAgent<R, W> {
    faction: Faction,
    input: R,
    output: W,
}

impl HumanAgent<BufReader<Stdin>, Stdout> {
    pub fn console(faction: Faction) -> Self {
        HumanAgent::new(faction, BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R: BufRead, W: Write> HumanAgent<R, W> {
    pub fn new(faction: Faction, input: R, output: W) -> Self {
        HumanAgent { faction, input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn label(view: &GameStateView, coord: HexCoord) -> String {
        view.hex(coord).map_or_else(|| coord.to_string(), |h| h.label.clone())
    }

    /// Menu line for one action, using hex labels instead of coordinates.
    pub fn describe(view: &GameStateView, action: &Action) -> String {
        let ids = |units: &[UnitId]| units.iter().map(|u| u.to_string()).collect::<Vec<_>>().join("+");
        match action {
            Action::Move { unit, to } => format!("move {} to {}", unit, Self::label(view, *to)),
            Action::Attack { attackers, target } => {
                format!("attack {} with {}", Self::label(view, *target), ids(attackers))
            }
            Action::Fortify { unit } => format!("fortify {}", unit),
            Action::EngineerAction { unit, target } => {
                format!("engineer {} entrenches {}", unit, Self::label(view, *target))
            }
            Action::ArtillerySupport { unit, target } => {
                format!("artillery {} supports attack on {}", unit, Self::label(view, *target))
            }
        }
    }

    fn print_menu(&mut self, view: &GameStateView, legal: &[Action]) -> io::Result<()> {
        let out = &mut self.output;
        writeln!(out, "\n--- {} turn {}/{} ---", self.faction, view.turn, view.max_turns)?;
        if let Some(lift) = view.lift_capacity {
            writeln!(out, "Lift capacity {}, {} reinforcements waiting", lift, view.reinforcements_waiting)?;
        }
        writeln!(out, "Your units:")?;
        for u in view.my_units() {
            writeln!(
                out,
                "  {} {} ({}) at {} str {} {:?} mp {}{}",
                u.id,
                u.name,
                u.unit_type,
                Self::label(view, u.position),
                u.strength,
                u.supply,
                u.movement_left.unwrap_or(0),
                if u.entrenched { " entrenched" } else { "" },
            )?;
        }
        writeln!(out, "Legal actions:")?;
        for (i, action) in legal.iter().enumerate() {
            writeln!(out, "  [{}] {}", i, Self::describe(view, action))?;
        }
        Ok(())
    }

    fn read_queue(&mut self, view: &GameStateView, legal: &[Action], budget: &DecisionBudget) -> io::Result<Vec<Action>> {
        self.print_menu(view, legal)?;
        let mut queue: Vec<Action> = Vec::new();
        loop {
            write!(self.output, "{}> ", self.faction)?;
            self.output.flush()?;
            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(queue);
            }
            let line = line.trim();
            match line {
                "" | "done" | "pass" => return Ok(queue),
                "list" => self.print_menu(view, legal)?,
                "undo" => {
                    if let Some(a) = queue.pop() {
                        writeln!(self.output, "dropped: {}", Self::describe(view, &a))?;
                    }
                }
                _ => {
                    for token in line.split(|c: char| c == ',' || c.is_whitespace()).filter(|t| !t.is_empty()) {
                        match token.parse::<usize>().ok().and_then(|i| legal.get(i)) {
                            Some(action) if queue.len() < budget.max_actions => {
                                writeln!(self.output, "queued: {}", Self::describe(view, action))?;
                                queue.push(action.clone());
                            }
                            Some(_) => writeln!(self.output, "limit of {} actions reached", budget.max_actions)?,
                            None => writeln!(self.output, "no action '{}'", token)?,
                        }
                    }
                }
            }
        }
    }
}

impl<R: BufRead + Send, W: Write + Send> Agent for HumanAgent<R, W> {
    fn name(&self) -> &str {
        "Human"
    }

    fn faction(&self) -> Faction {
        self.faction
    }

    fn choose_actions(&mut self, view: &GameStateView, legal: &[Action], budget: &DecisionBudget) -> Vec<Action> {
        match self.read_queue(view, legal, budget) {
            Ok(queue) => queue,
            Err(err) => {
                warn!(faction = %self.faction, %err, "console unavailable, passing");
                Vec::new()
            }
        }
    }
}
