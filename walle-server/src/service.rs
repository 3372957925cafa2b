//! gRPC service implementation for the game server
//!
//! This module provides the Tonic-based `Games` service. Handlers translate
//! protobuf requests into calls on the shared [`GameRegistry`] and map
//! registry errors onto gRPC status codes. Gameplay outcomes (including a lost
//! game) are always successful responses.

use std::sync::Arc;

use tonic::{Request, Response, Result as TonicResult, Status};
use tracing::{debug, info};
use walle_core::{Action, Direction, GameId, GameRegistry, GameStatus, RegistryError};
use walle_proto::{
    games_server::Games, ActionRequest, ActionResponse, BoardResponse, CreateGameRequest,
    CreateGameResponse, DeleteGameRequest, DeleteGameResponse, Direction as ProtoDirection,
    GameInfo, GameStatus as ProtoGameStatus, GetBoardRequest, ListGamesRequest,
    ListGamesResponse,
};

use crate::metrics::{ActionOutcome, Metrics};

/// Games gRPC service implementation
#[derive(Debug, Clone)]
pub struct GamesService {
    registry: Arc<GameRegistry>,
    metrics: Arc<Metrics>,
}

impl GamesService {
    pub fn new(registry: Arc<GameRegistry>, metrics: Arc<Metrics>) -> Self {
        Self { registry, metrics }
    }

    pub fn registry(&self) -> &Arc<GameRegistry> {
        &self.registry
    }

    fn parse_game_id(raw: &str) -> Result<GameId, Status> {
        raw.parse()
            .map_err(|_| Status::invalid_argument(format!("Malformed game_id: {:?}", raw)))
    }

    fn parse_direction(raw: i32) -> Result<Direction, Status> {
        match ProtoDirection::try_from(raw) {
            Ok(ProtoDirection::Up) => Ok(Direction::Up),
            Ok(ProtoDirection::Down) => Ok(Direction::Down),
            Ok(ProtoDirection::Left) => Ok(Direction::Left),
            Ok(ProtoDirection::Right) => Ok(Direction::Right),
            Ok(ProtoDirection::Unspecified) | Err(_) => Err(Status::invalid_argument(format!(
                "Invalid direction: {}",
                raw
            ))),
        }
    }

    /// Convert internal status to protobuf format
    fn status_to_proto(status: GameStatus) -> i32 {
        let status = match status {
            GameStatus::InProgress => ProtoGameStatus::InProgress,
            GameStatus::Lost => ProtoGameStatus::Lost,
            GameStatus::Won => ProtoGameStatus::Won,
        };
        status as i32
    }

    fn registry_error(err: RegistryError) -> Status {
        match err {
            RegistryError::NotFound(id) => Status::not_found(format!("Game not found: {}", id)),
            RegistryError::CapacityReached { limit } => {
                Status::resource_exhausted(format!("Game limit of {} reached", limit))
            }
            RegistryError::Game(e) => Status::invalid_argument(e.to_string()),
        }
    }

    /// Apply one action to a stored game
    fn act(&self, request: ActionRequest, action: Action) -> Result<ActionResponse, Status> {
        let game_id = Self::parse_game_id(&request.game_id)?;
        let direction = Self::parse_direction(request.direction)?;

        let (success, before, after, carries) = self
            .registry
            .with_game(&game_id, |game| {
                let before = game.status();
                let success = game.perform(action, direction);
                (success, before, game.status(), game.robot_carries_flower())
            })
            .map_err(Self::registry_error)?;

        let outcome = ActionOutcome::classify(success, before, after);
        self.metrics.record_action(action, outcome);
        debug!(
            %game_id,
            action = action.name(),
            ?direction,
            outcome = outcome.label(),
            "action applied"
        );
        if outcome == ActionOutcome::Won || outcome == ActionOutcome::Lost {
            info!(%game_id, status = ?after, "game finished");
        }

        Ok(ActionResponse {
            success,
            status: Self::status_to_proto(after),
            robot_carries_flower: carries,
        })
    }
}

#[tonic::async_trait]
impl Games for GamesService {
    async fn create_game(
        &self,
        request: Request<CreateGameRequest>,
    ) -> TonicResult<Response<CreateGameResponse>> {
        let req = request.into_inner();

        let game_id = self
            .registry
            .create(req.width as usize, req.height as usize)
            .map_err(Self::registry_error)?;
        self.metrics.record_game_created();

        Ok(Response::new(CreateGameResponse {
            game_id: game_id.to_string(),
        }))
    }

    async fn list_games(
        &self,
        _request: Request<ListGamesRequest>,
    ) -> TonicResult<Response<ListGamesResponse>> {
        let games = self
            .registry
            .list()
            .into_iter()
            .map(|summary| GameInfo {
                game_id: summary.id.to_string(),
                width: summary.width as u32,
                height: summary.height as u32,
                status: Self::status_to_proto(summary.status),
            })
            .collect();

        Ok(Response::new(ListGamesResponse { games }))
    }

    async fn get_board(
        &self,
        request: Request<GetBoardRequest>,
    ) -> TonicResult<Response<BoardResponse>> {
        let game_id = Self::parse_game_id(&request.into_inner().game_id)?;

        let response = self
            .registry
            .with_game(&game_id, |game| BoardResponse {
                board: game.render_board(),
                robot_carries_flower: game.robot_carries_flower(),
                status: Self::status_to_proto(game.status()),
            })
            .map_err(Self::registry_error)?;

        Ok(Response::new(response))
    }

    async fn delete_game(
        &self,
        request: Request<DeleteGameRequest>,
    ) -> TonicResult<Response<DeleteGameResponse>> {
        let game_id = Self::parse_game_id(&request.into_inner().game_id)?;

        let removed = self.registry.remove(&game_id);
        if removed {
            self.metrics.record_game_removed();
        }

        Ok(Response::new(DeleteGameResponse { removed }))
    }

    async fn move_robot(
        &self,
        request: Request<ActionRequest>,
    ) -> TonicResult<Response<ActionResponse>> {
        self.act(request.into_inner(), Action::Move).map(Response::new)
    }

    async fn clean_debris(
        &self,
        request: Request<ActionRequest>,
    ) -> TonicResult<Response<ActionResponse>> {
        self.act(request.into_inner(), Action::CleanDebris)
            .map(Response::new)
    }

    async fn pick_up_flower(
        &self,
        request: Request<ActionRequest>,
    ) -> TonicResult<Response<ActionResponse>> {
        self.act(request.into_inner(), Action::PickUpFlower)
            .map(Response::new)
    }

    async fn drop_flower(
        &self,
        request: Request<ActionRequest>,
    ) -> TonicResult<Response<ActionResponse>> {
        self.act(request.into_inner(), Action::DropFlower)
            .map(Response::new)
    }
}
