//! Standard chess, validated by shakmaty.

use shakmaty::fen::Fen;
use shakmaty::uci::UciMove;
use shakmaty::{Chess, Color, EnPassantMode, Position as _};

use super::{Position, RulesEngine};
use crate::error::RulesError;
use crate::types::{Action, Outcome, Side};

/// Chess rules engine. White is side A, black is side B.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChessRules;

impl ChessRules {
    pub fn new() -> Self {
        Self
    }
}

impl RulesEngine for ChessRules {
    fn name(&self) -> &'static str {
        "chess"
    }

    fn new_position(&self) -> Box<dyn Position> {
        Box::new(ChessPosition(Chess::default()))
    }
}

#[derive(Debug, Clone)]
struct ChessPosition(Chess);

fn side_of(color: Color) -> Side {
    match color {
        Color::White => Side::A,
        Color::Black => Side::B,
    }
}

impl Position for ChessPosition {
    fn turn(&self) -> Side {
        side_of(self.0.turn())
    }

    fn apply_action(&self, action: &Action) -> Result<Box<dyn Position>, RulesError> {
        if self.classify_outcome().is_terminal() {
            return Err(RulesError::AlreadyDecided);
        }

        let notation = action.to_string().to_ascii_lowercase();
        let uci: UciMove = notation
            .parse()
            .map_err(|_| RulesError::malformed(notation.clone()))?;
        let chess_move = uci
            .to_move(&self.0)
            .map_err(|_| RulesError::illegal(notation))?;

        let mut next = self.0.clone();
        next.play_unchecked(&chess_move);
        Ok(Box::new(ChessPosition(next)))
    }

    fn classify_outcome(&self) -> Outcome {
        match self.0.outcome() {
            None => Outcome::None,
            Some(shakmaty::Outcome::Decisive { winner }) => Outcome::win_for(side_of(winner)),
            Some(shakmaty::Outcome::Draw) => Outcome::Draw,
        }
    }

    fn notation(&self) -> String {
        Fen::from_position(self.0.clone(), EnPassantMode::Legal).to_string()
    }
}
