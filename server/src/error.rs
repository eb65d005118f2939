use thiserror::Error;

/// Rejections sent back to the requester as `room_error` events.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    #[error("Room {0} was not found")]
    NotFound(String),
    #[error("Room {0} is full")]
    Full(String),
    #[error("The game has already started")]
    AlreadyStarted,
    #[error("The game has not started")]
    NotStarted,
    #[error("You are not in a room")]
    NotInRoom,
    #[error("Only the room creator can start the game")]
    NotAdmin,
    #[error("At least two players are needed to start")]
    NotEnoughPlayers,
    #[error("The room was closed")]
    Closed,
}
