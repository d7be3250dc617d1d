//! Interactive input - text to action components with a retry loop

use std::io::{BufRead, Write};

use thiserror::Error;

use crate::actions::component::{ActionComponent, ActionDims, Component};
use crate::actions::compound::{CompoundAction, Stage};
use crate::core::types::Coord;
use crate::world::building::Building;
use crate::world::objects::Worker;

/// Malformed human input; the caller re-prompts
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("'{0}' is not a number")]
    NotANumber(String),

    #[error("worker {0} does not exist")]
    UnknownWorker(usize),

    #[error("building index {0} is out of range")]
    UnknownBuilding(usize),

    #[error("({i}, {j}) is outside the world")]
    OutOfBounds { i: i64, j: i64 },

    #[error("expected {expected}, got '{got}'")]
    Shape { expected: &'static str, got: String },
}

fn number(token: &str) -> Result<i64, InputError> {
    token
        .parse()
        .map_err(|_| InputError::NotANumber(token.to_string()))
}

fn parse_coord(tokens: &[&str], dims: &ActionDims) -> Result<Coord, InputError> {
    let [i, j] = tokens else {
        return Err(InputError::Shape {
            expected: "two numbers 'i j'",
            got: tokens.join(" "),
        });
    };
    let (i, j) = (number(i)?, number(j)?);
    let side = dims.world_size.side() as i64;
    if !(0..side).contains(&i) || !(0..side).contains(&j) {
        return Err(InputError::OutOfBounds { i, j });
    }
    Ok(Coord::new(i as i32, j as i32))
}

/// Parse one line of input for the stage `action` is at
///
/// Worker stages take 1-based worker numbers (empty selects nobody). The
/// Workers stage takes a building index or an `i j` coordinate; the Building
/// stage takes an `i j` coordinate.
pub fn parse_input(
    action: &CompoundAction,
    line: &str,
    dims: &ActionDims,
) -> Result<Vec<Component>, InputError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    match action.stage() {
        Stage::NoWorkers | Stage::Coord | Stage::BuildingCoord => tokens
            .iter()
            .map(|token| {
                let n = number(token)?;
                usize::try_from(n)
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|code| Worker::parse(code, dims).ok())
                    .map(Component::Worker)
                    .ok_or(InputError::UnknownWorker(n.max(0) as usize))
            })
            .collect(),
        Stage::Workers => match tokens.as_slice() {
            [index] => {
                let n = number(index)?;
                usize::try_from(n)
                    .ok()
                    .and_then(|code| Building::parse(code, dims).ok())
                    .map(|b| vec![Component::Building(b)])
                    .ok_or(InputError::UnknownBuilding(n.max(0) as usize))
            }
            _ => Ok(vec![Component::Coord(parse_coord(&tokens, dims)?)]),
        },
        Stage::Building => Ok(vec![Component::Coord(parse_coord(&tokens, dims)?)]),
    }
}

/// Prompt until a line parses; `None` on end of input
pub fn read_components<R: BufRead, W: Write>(
    action: &CompoundAction,
    dims: &ActionDims,
    reader: &mut R,
    writer: &mut W,
) -> std::io::Result<Option<Vec<Component>>> {
    loop {
        writeln!(writer, "{}", action.prompt(dims))?;
        writer.flush()?;
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        match parse_input(action, &line, dims) {
            Ok(components) => return Ok(Some(components)),
            Err(e) => writeln!(writer, "{e}")?,
        }
    }
}
