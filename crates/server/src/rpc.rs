//! Protobuf adapter for the submission RPC.
//!
//! Bytes in, bytes out. Decoding failures and rejections both become an
//! [`ErrorStatus`] carrying the machine-readable kind.

use scoreguard_wire::{
    ErrorStatus, GameDataProto, SubmitScoreResponse, WireError, decode_request,
};

use crate::error::SubmitError;
use crate::{GameSubmission, ScoreService, SubmitOutcome};

/// Reply to one submission call.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcReply {
    Ok(SubmitScoreResponse),
    Err(ErrorStatus),
}

impl RpcReply {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Ok(response) => prost::Message::encode_to_vec(response),
            Self::Err(status) => prost::Message::encode_to_vec(status),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }
}

impl From<SubmitOutcome> for SubmitScoreResponse {
    fn from(outcome: SubmitOutcome) -> Self {
        Self {
            success: outcome.success,
            verified: outcome.verified,
            score: outcome.score,
            new_best: outcome.new_best,
            rank: outcome.rank,
            flags: outcome.flags,
        }
    }
}

impl From<&SubmitError> for ErrorStatus {
    fn from(err: &SubmitError) -> Self {
        Self {
            kind: err.kind().as_str().to_string(),
            message: err.to_string(),
        }
    }
}

fn to_submission(data: GameDataProto) -> Result<GameSubmission, WireError> {
    let inputs = data.decode_inputs()?;
    Ok(GameSubmission {
        session_id: data.session_id,
        game_id: data.game_id,
        seed: data.seed,
        inputs,
        final_score: data.final_score,
        duration: data.duration,
        checksum: data.checksum,
    })
}

/// Decode, verify and answer one `SubmitScoreRequest`.
pub fn handle_submit(service: &ScoreService, bytes: &[u8]) -> RpcReply {
    let result = decode_request(bytes)
        .map_err(|e| SubmitError::Malformed(e.to_string()))
        .and_then(|request| {
            let data = request.game_data.ok_or_else(|| {
                SubmitError::Malformed(WireError::MissingGameData.to_string())
            })?;
            let submission =
                to_submission(data).map_err(|e| SubmitError::Malformed(e.to_string()))?;
            let caller = (!request.caller.is_empty()).then_some(request.caller.as_str());
            service.submit_score(caller, &submission)
        });

    match result {
        Ok(outcome) => RpcReply::Ok(outcome.into()),
        Err(err) => {
            tracing::debug!(kind = %err.kind(), error = %err, "Submission rejected");
            RpcReply::Err(ErrorStatus::from(&err))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use prost::Message;
    use scoreguard_replay::generate_checksum;
    use scoreguard_sim::GameInput;
    use scoreguard_wire::{GameInputProto, SubmitScoreRequest};

    use super::*;
    use crate::clock::FixedClock;
    use crate::config::ServiceConfig;
    use crate::escalation::PlayerAccount;
    use crate::session::{GameMode, GameSession};

    const PLAYER: &str = "0xplayer";

    fn service() -> ScoreService {
        let service =
            ScoreService::in_memory(ServiceConfig::default(), Arc::new(FixedClock::new(10_000)));
        service.players().insert(PlayerAccount::new(PLAYER));
        service
            .sessions()
            .insert(GameSession {
                session_id: "s1".to_string(),
                player: PLAYER.to_string(),
                game_id: "neon_runner".to_string(),
                mode: GameMode::Ranked,
                seed: 77,
                started_at: 0,
                expires_at: 1_000_000,
                completed_at: None,
                final_score: None,
                verified: false,
            })
            .unwrap();
        service
    }

    fn request(caller: &str, inputs: Vec<GameInput>, final_score: u64) -> SubmitScoreRequest {
        SubmitScoreRequest {
            caller: caller.to_string(),
            game_data: Some(GameDataProto {
                session_id: "s1".to_string(),
                game_id: "neon_runner".to_string(),
                seed: 77,
                checksum: generate_checksum(&inputs, 77),
                inputs: inputs.into_iter().map(GameInputProto::from).collect(),
                final_score,
                duration: 60_000,
            }),
        }
    }

    fn human_inputs() -> Vec<GameInput> {
        (0..40u64)
            .map(|i| GameInput::action(i * 700 + (i * 37) % 250, i % 2 == 0))
            .collect()
    }

    #[test]
    fn test_accepted_submission_encodes_response() {
        let service = service();
        let bytes = request(PLAYER, human_inputs(), 900).encode_to_vec();

        let reply = handle_submit(&service, &bytes);
        let RpcReply::Ok(response) = &reply else {
            panic!("expected success, got {reply:?}");
        };
        assert!(response.success);
        assert!(!response.verified);
        assert_eq!(response.score, 900);
        assert_eq!(response.rank, Some(1));

        let decoded = SubmitScoreResponse::decode(reply.encode().as_slice()).unwrap();
        assert_eq!(&decoded, response);
    }

    #[test]
    fn test_rejection_carries_kind() {
        let service = service();
        let reply = handle_submit(&service, &request("", human_inputs(), 900).encode_to_vec());
        assert_eq!(
            reply,
            RpcReply::Err(ErrorStatus {
                kind: "unauthenticated".to_string(),
                message: "caller is not authenticated".to_string(),
            })
        );

        let bytes = request(PLAYER, human_inputs(), 10_000_000).encode_to_vec();
        let RpcReply::Err(status) = handle_submit(&service, &bytes) else {
            panic!("impossible score accepted");
        };
        assert_eq!(status.kind, "invalid-argument");
    }

    #[test]
    fn test_malformed_payloads() {
        let service = service();
        let RpcReply::Err(status) = handle_submit(&service, &[0xff, 0xff, 0xff]) else {
            panic!("garbage accepted");
        };
        assert_eq!(status.kind, "invalid-argument");

        let mut bad_type = request(PLAYER, human_inputs(), 900);
        if let Some(data) = bad_type.game_data.as_mut() {
            data.inputs[0].r#type = "teleport".to_string();
        }
        let RpcReply::Err(status) = handle_submit(&service, &bad_type.encode_to_vec()) else {
            panic!("unknown input type accepted");
        };
        assert_eq!(status.kind, "invalid-argument");
        assert!(status.message.contains("teleport"));

        let empty = SubmitScoreRequest {
            caller: PLAYER.to_string(),
            game_data: None,
        };
        let RpcReply::Err(status) = handle_submit(&service, &empty.encode_to_vec()) else {
            panic!("missing game data accepted");
        };
        assert!(status.message.contains("gameData"));
    }
}
