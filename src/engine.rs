#![allow(dead_code)]
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::rc::Rc;

use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::error::{Error, Result};

pub const TIME_PENALTY: i64 = 1;
pub const FOOD_REWARD: i64 = 10;
pub const WIN_REWARD: i64 = 500;
pub const LOSS_PENALTY: i64 = 500;

/// What a learner is allowed to see of a game.
pub trait GameState: Clone + Eq + Hash {
    /// Moves available at the agent's position, possibly including `Stop`.
    fn legal_actions(&self) -> Vec<Direction>;
    fn score(&self) -> f64;
    fn agent_position(&self) -> Position;
    fn adversary_positions(&self) -> Vec<Position>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub fn new(x: usize, y: usize) -> Self {
        Position { x, y }
    }

    fn step(self, direction: Direction) -> Option<Position> {
        let (dx, dy) = direction.offset();
        Some(Position {
            x: self.x.checked_add_signed(dx)?,
            y: self.y.checked_add_signed(dy)?,
        })
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    South,
    East,
    West,
    Stop,
}

impl Direction {
    // Enumeration order of legal actions
    pub const ALL: [Direction; 5] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
        Direction::Stop,
    ];

    fn offset(self) -> (isize, isize) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
            Direction::Stop => (0, 0),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::North => "North",
            Direction::South => "South",
            Direction::East => "East",
            Direction::West => "West",
            Direction::Stop => "Stop",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Win,
    Lose,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IllegalMoveReason {
    GameComplete,
    IntoWall,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TransitionResult {
    // Transition did occur, game state was updated
    MoveAccepted,
    GameComplete(Outcome),

    // Transition did not occur, game state unchanged
    IllegalMove(IllegalMoveReason),
}

#[derive(Debug, PartialEq, Eq)]
struct Walls {
    width: usize,
    height: usize,
    cells: Vec<bool>,
}

impl Walls {
    fn is_wall(&self, pos: Position) -> bool {
        if pos.x >= self.width || pos.y >= self.height {
            return true;
        }
        self.cells[pos.y * self.width + pos.x]
    }

    fn open_moves(&self, from: Position) -> impl Iterator<Item = Direction> + '_ {
        Direction::ALL
            .into_iter()
            .filter(|d| *d != Direction::Stop)
            .filter(move |d| matches!(from.step(*d), Some(to) if !self.is_wall(to)))
    }
}

/// A parsed board: `%` wall, `.` food, `P` agent, `G` ghost, space empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    walls: Rc<Walls>,
    food: BTreeSet<Position>,
    agent_start: Position,
    ghost_starts: Vec<Position>,
}

const SMALL_GRID: &str = "\
%%%%%%%
%    .%
% %%% %
%P. G %
%%%%%%%";

const MEDIUM_GRID: &str = "\
%%%%%%%%
%P     %
% .% . %
%  %   %
% .% . %
%     G%
%%%%%%%%";

impl Layout {
    pub fn by_name(name: &str) -> Result<Layout> {
        match name {
            "small_grid" => Layout::parse(SMALL_GRID),
            "medium_grid" => Layout::parse(MEDIUM_GRID),
            _ => Err(Error::UnknownLayout(name.to_string())),
        }
    }

    pub fn parse(text: &str) -> Result<Layout> {
        let rows: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
        let width = rows.first().map(|r| r.chars().count()).unwrap_or(0);
        if width == 0 {
            return Err(Error::InvalidLayout {
                line: 1,
                reason: "layout is empty".to_string(),
            });
        }

        let mut cells = Vec::with_capacity(width * rows.len());
        let mut food = BTreeSet::new();
        let mut agent_start = None;
        let mut ghost_starts = Vec::new();

        for (y, row) in rows.iter().enumerate() {
            if row.chars().count() != width {
                return Err(Error::InvalidLayout {
                    line: y + 1,
                    reason: format!("expected {} columns, got {}", width, row.chars().count()),
                });
            }
            for (x, c) in row.chars().enumerate() {
                let pos = Position::new(x, y);
                cells.push(c == '%');
                match c {
                    '%' | ' ' => {}
                    '.' => {
                        food.insert(pos);
                    }
                    'G' => ghost_starts.push(pos),
                    'P' => {
                        if agent_start.replace(pos).is_some() {
                            return Err(Error::InvalidLayout {
                                line: y + 1,
                                reason: "more than one agent start".to_string(),
                            });
                        }
                    }
                    other => {
                        return Err(Error::InvalidLayout {
                            line: y + 1,
                            reason: format!("unexpected character '{}'", other),
                        })
                    }
                }
            }
        }

        let agent_start = agent_start.ok_or_else(|| Error::InvalidLayout {
            line: rows.len(),
            reason: "no agent start".to_string(),
        })?;
        if food.is_empty() {
            return Err(Error::InvalidLayout {
                line: rows.len(),
                reason: "no food".to_string(),
            });
        }

        Ok(Layout {
            walls: Rc::new(Walls {
                width,
                height: rows.len(),
                cells,
            }),
            food,
            agent_start,
            ghost_starts,
        })
    }

    pub fn initial_state(&self) -> GridState {
        GridState {
            walls: Rc::clone(&self.walls),
            agent: self.agent_start,
            ghosts: self.ghost_starts.clone(),
            food: self.food.clone(),
            score: 0,
            outcome: None,
        }
    }
}

/// One configuration of the grid world.
///
/// Equality and hashing cover the board (agent, ghosts, food) and outcome,
/// not the score, so positions reached along different paths compare equal.
#[derive(Debug, Clone)]
pub struct GridState {
    walls: Rc<Walls>,
    pub agent: Position,
    pub ghosts: Vec<Position>,
    pub food: BTreeSet<Position>,
    pub score: i64,
    pub outcome: Option<Outcome>,
}

impl PartialEq for GridState {
    fn eq(&self, other: &Self) -> bool {
        self.agent == other.agent
            && self.ghosts == other.ghosts
            && self.food == other.food
            && self.outcome == other.outcome
    }
}

impl Eq for GridState {}

impl Hash for GridState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.agent.hash(state);
        self.ghosts.hash(state);
        self.food.hash(state);
        self.outcome.hash(state);
    }
}

impl GameState for GridState {
    fn legal_actions(&self) -> Vec<Direction> {
        if self.is_complete() {
            return vec![];
        }
        let mut actions: Vec<Direction> = self.walls.open_moves(self.agent).collect();
        actions.push(Direction::Stop);
        actions
    }

    fn score(&self) -> f64 {
        self.score as f64
    }

    fn agent_position(&self) -> Position {
        self.agent
    }

    fn adversary_positions(&self) -> Vec<Position> {
        self.ghosts.clone()
    }
}

impl GridState {
    pub fn is_complete(&self) -> bool {
        self.outcome.is_some()
    }

    /// Applies the agent's move, then moves every ghost one random step.
    pub fn transition<R: Rng + ?Sized>(
        &mut self,
        action: Direction,
        rng: &mut R,
    ) -> TransitionResult {
        if self.is_complete() {
            return TransitionResult::IllegalMove(IllegalMoveReason::GameComplete);
        }
        let next = match self.agent.step(action) {
            Some(pos) if !self.walls.is_wall(pos) => pos,
            _ => return TransitionResult::IllegalMove(IllegalMoveReason::IntoWall),
        };

        self.agent = next;
        self.score -= TIME_PENALTY;

        if self.ghosts.contains(&self.agent) {
            return self.finish(Outcome::Lose);
        }

        if self.food.remove(&self.agent) {
            self.score += FOOD_REWARD;
            if self.food.is_empty() {
                return self.finish(Outcome::Win);
            }
        }

        for i in 0..self.ghosts.len() {
            let ghost = self.ghosts[i];
            let moves: Vec<Direction> = self.walls.open_moves(ghost).collect();
            // Boxed-in ghosts stay put
            if let Some(step) = moves.choose(rng).and_then(|d| ghost.step(*d)) {
                self.ghosts[i] = step;
            }
        }

        if self.ghosts.contains(&self.agent) {
            return self.finish(Outcome::Lose);
        }

        TransitionResult::MoveAccepted
    }

    fn finish(&mut self, outcome: Outcome) -> TransitionResult {
        match outcome {
            Outcome::Win => self.score += WIN_REWARD,
            Outcome::Lose => self.score -= LOSS_PENALTY,
        }
        self.outcome = Some(outcome);
        TransitionResult::GameComplete(outcome)
    }

    pub fn calculate_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    pub fn render(&self) -> String {
        (0..self.walls.height)
            .map(|y| {
                (0..self.walls.width)
                    .map(|x| {
                        let pos = Position::new(x, y);
                        if self.walls.is_wall(pos) {
                            '%'
                        } else if self.ghosts.contains(&pos) {
                            'G'
                        } else if self.agent == pos {
                            'P'
                        } else if self.food.contains(&pos) {
                            '.'
                        } else {
                            ' '
                        }
                    })
                    .collect::<String>()
            })
            .join("\n")
    }

    pub fn display(&self) {
        debug!(
            hash = self.calculate_hash(),
            score = self.score,
            outcome = ?self.outcome,
            "board:\n{}",
            self.render()
        );
    }
}
