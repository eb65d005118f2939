use thiserror::Error;

/// Rejections sent back to the requesting player as `game_error` events.
/// State is never mutated when one of these is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("It is not your turn")]
    NotYourTurn,
    #[error("The game is not in progress")]
    NotInProgress,
    #[error("Invalid card selection")]
    InvalidSelection,
    #[error("Selected cards are not in your hand")]
    CardsNotInHand,
    #[error("Pickup index is out of range")]
    InvalidPickupIndex,
    #[error("Cannot call Yaniv with {value} points. Maximum is {max}.")]
    YanivAboveThreshold { value: u32, max: u32 },
    #[error("That card cannot be slapped down")]
    InvalidSlap,
    #[error("The match has not ended")]
    MatchStillRunning,
}
