//! Matchmaking flows driven through the public `Server` boundary.

use std::time::Duration;

use common::config::RoomConfig;
use common::event::client::Command;
use common::event::server::Event;
use common::Difficulty;
use server::config::Config;
use server::Server;
use tokio::sync::mpsc;
use tokio::time::timeout;
use uuid::Uuid;

async fn next_event(rx: &mut mpsc::Receiver<Event>) -> Event {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("an event arrives in time")
        .expect("the channel stays open")
}

fn test_server() -> Server {
    Server::new(Config::default())
}

#[tokio::test]
async fn creating_a_room_issues_a_code() {
    let server = test_server();
    let id = Uuid::new_v4();
    let mut rx = server.register_client(id);

    server
        .handle(
            id,
            Command::CreateRoom {
                nick_name: "ada".into(),
                config: RoomConfig::default(),
            },
        )
        .await;

    match next_event(&mut rx).await {
        Event::RoomCreated {
            room_id, players, ..
        } => {
            assert_eq!(room_id.len(), 6);
            assert!(room_id.chars().all(|c| c.is_ascii_alphanumeric()));
            assert_eq!(players.len(), 1);
            assert_eq!(players[0].nick_name, "ada");
        }
        other => panic!("expected room_created, got {other:?}"),
    }
}

#[tokio::test]
async fn joining_an_unknown_room_is_rejected() {
    let server = test_server();
    let id = Uuid::new_v4();
    let mut rx = server.register_client(id);

    server
        .handle(
            id,
            Command::JoinRoom {
                room_id: "NOSUCH".into(),
                nick_name: "bob".into(),
            },
        )
        .await;

    assert!(matches!(
        next_event(&mut rx).await,
        Event::RoomError { message } if message.contains("not found")
    ));
}

#[tokio::test]
async fn joining_broadcasts_to_everyone() {
    let server = test_server();
    let creator = Uuid::new_v4();
    let joiner = Uuid::new_v4();
    let mut creator_rx = server.register_client(creator);
    let mut joiner_rx = server.register_client(joiner);

    server
        .handle(
            creator,
            Command::CreateRoom {
                nick_name: "ada".into(),
                config: RoomConfig::default(),
            },
        )
        .await;
    let room_id = match next_event(&mut creator_rx).await {
        Event::RoomCreated { room_id, .. } => room_id,
        other => panic!("expected room_created, got {other:?}"),
    };

    server
        .handle(
            joiner,
            Command::JoinRoom {
                room_id: room_id.clone(),
                nick_name: "bob".into(),
            },
        )
        .await;

    for rx in [&mut creator_rx, &mut joiner_rx] {
        match next_event(rx).await {
            Event::PlayerJoined {
                room_id: event_room,
                player,
                players,
            } => {
                assert_eq!(event_room, room_id);
                assert_eq!(player.nick_name, "bob");
                assert_eq!(players.len(), 2);
            }
            other => panic!("expected player_joined, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn quick_games_pool_into_one_room() {
    let server = test_server();
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();
    let mut first_rx = server.register_client(first);
    let mut second_rx = server.register_client(second);

    server
        .handle(
            first,
            Command::QuickGame {
                nick_name: "ada".into(),
            },
        )
        .await;
    let room_id = match next_event(&mut first_rx).await {
        Event::RoomCreated { room_id, .. } => room_id,
        other => panic!("expected room_created, got {other:?}"),
    };

    server
        .handle(
            second,
            Command::QuickGame {
                nick_name: "bob".into(),
            },
        )
        .await;
    match next_event(&mut second_rx).await {
        Event::PlayerJoined {
            room_id: event_room,
            ..
        } => assert_eq!(event_room, room_id),
        other => panic!("expected player_joined, got {other:?}"),
    }

    // votes are broadcast as they land
    server
        .handle(
            second,
            Command::SetQuickGameConfig {
                room_id: room_id.clone(),
                nick_name: "bob".into(),
                config: RoomConfig {
                    slap_down: false,
                    ..RoomConfig::default()
                },
            },
        )
        .await;
    // skip first's copy of player_joined
    let _ = next_event(&mut first_rx).await;
    match next_event(&mut first_rx).await {
        Event::VotesConfig { votes, .. } => {
            assert!(!votes["bob"].slap_down);
        }
        other => panic!("expected votes_config, got {other:?}"),
    }
}

#[tokio::test]
async fn bot_rooms_start_immediately() {
    let server = test_server();
    let id = Uuid::new_v4();
    let mut rx = server.register_client(id);

    server
        .handle(
            id,
            Command::CreateBotRoom {
                nick_name: "ada".into(),
                config: RoomConfig::default(),
                difficulties: vec![Difficulty::Easy, Difficulty::Hard],
            },
        )
        .await;

    match next_event(&mut rx).await {
        Event::RoomCreated { players, .. } => {
            assert_eq!(players.len(), 3);
            assert_eq!(players.iter().filter(|p| p.is_bot).count(), 2);
        }
        other => panic!("expected room_created, got {other:?}"),
    }
    assert!(matches!(next_event(&mut rx).await, Event::StartGame { .. }));
    match next_event(&mut rx).await {
        Event::GameInitialized {
            hands,
            pickup_cards,
            ..
        } => {
            assert_eq!(hands.len(), 3);
            assert!(hands.values().all(|h| h.len() == 5));
            assert_eq!(pickup_cards.len(), 1);
        }
        other => panic!("expected game_initialized, got {other:?}"),
    }
}

#[tokio::test]
async fn private_games_start_on_the_admins_word() {
    let server = test_server();
    let creator = Uuid::new_v4();
    let joiner = Uuid::new_v4();
    let mut creator_rx = server.register_client(creator);
    let mut joiner_rx = server.register_client(joiner);

    server
        .handle(
            creator,
            Command::CreateRoom {
                nick_name: "ada".into(),
                config: RoomConfig::default(),
            },
        )
        .await;
    let room_id = match next_event(&mut creator_rx).await {
        Event::RoomCreated { room_id, .. } => room_id,
        other => panic!("expected room_created, got {other:?}"),
    };

    // a non-admin cannot start the game
    server
        .handle(
            joiner,
            Command::JoinRoom {
                room_id: room_id.clone(),
                nick_name: "bob".into(),
            },
        )
        .await;
    let _ = next_event(&mut joiner_rx).await;
    server
        .handle(
            joiner,
            Command::StartPrivateGame {
                room_id: room_id.clone(),
            },
        )
        .await;
    assert!(matches!(
        next_event(&mut joiner_rx).await,
        Event::RoomError { message } if message.contains("creator")
    ));

    server
        .handle(
            creator,
            Command::StartPrivateGame {
                room_id: room_id.clone(),
            },
        )
        .await;
    let _ = next_event(&mut creator_rx).await; // player_joined
    assert!(matches!(
        next_event(&mut creator_rx).await,
        Event::StartGame { .. }
    ));
}

#[tokio::test]
async fn leaving_empties_and_destroys_the_room() {
    let server = test_server();
    let id = Uuid::new_v4();
    let mut rx = server.register_client(id);

    server
        .handle(
            id,
            Command::CreateRoom {
                nick_name: "ada".into(),
                config: RoomConfig::default(),
            },
        )
        .await;
    let room_id = match next_event(&mut rx).await {
        Event::RoomCreated { room_id, .. } => room_id,
        other => panic!("expected room_created, got {other:?}"),
    };

    server
        .handle(
            id,
            Command::LeaveRoom {
                nick_name: "ada".into(),
                is_admin: true,
            },
        )
        .await;
    let _ = next_event(&mut rx).await; // player_left

    // the code is gone; re-joining it fails
    let late = Uuid::new_v4();
    let mut late_rx = server.register_client(late);
    // give the room task a moment to wind down
    tokio::time::sleep(Duration::from_millis(100)).await;
    server
        .handle(
            late,
            Command::JoinRoom {
                room_id,
                nick_name: "bob".into(),
            },
        )
        .await;
    assert!(matches!(
        next_event(&mut late_rx).await,
        Event::RoomError { message } if message.contains("not found")
    ));
}

#[tokio::test]
async fn room_state_is_reported_on_request() {
    let server = test_server();
    let id = Uuid::new_v4();
    let mut rx = server.register_client(id);

    server
        .handle(
            id,
            Command::CreateRoom {
                nick_name: "ada".into(),
                config: RoomConfig {
                    max_match_points: 50,
                    ..RoomConfig::default()
                },
            },
        )
        .await;
    let room_id = match next_event(&mut rx).await {
        Event::RoomCreated { room_id, .. } => room_id,
        other => panic!("expected room_created, got {other:?}"),
    };

    server
        .handle(id, Command::GetRoomState { room_id: room_id.clone() })
        .await;
    match next_event(&mut rx).await {
        Event::RoomState {
            room_id: event_room,
            config,
            players,
            game_state,
        } => {
            assert_eq!(event_room, room_id);
            assert_eq!(config.max_match_points, 50);
            assert_eq!(players.len(), 1);
            assert_eq!(game_state, common::players::RoomPhase::Waiting);
        }
        other => panic!("expected room_state, got {other:?}"),
    }
}

#[tokio::test]
async fn turns_outside_a_room_are_rejected() {
    let server = test_server();
    let id = Uuid::new_v4();
    let mut rx = server.register_client(id);

    server.handle(id, Command::CallYaniv).await;
    assert!(matches!(
        next_event(&mut rx).await,
        Event::RoomError { message } if message.contains("not in a room")
    ));
}
