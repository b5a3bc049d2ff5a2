//! Wire surface: the named event catalog exchanged over the signaling
//! channel. Every inbound event has a fixed schema; unknown events are
//! dropped by the router rather than rejected at parse time, so older and
//! newer clients can coexist.

use serde::{Deserialize, Serialize};

use crate::model::ConnectionId;

/// Events accepted from a client connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientEvent {
    JoinRoom {
        room_id: String,
        user_name: String,
        #[serde(default)]
        user_id: Option<String>,
    },
    Offer { target_id: ConnectionId, payload: serde_json::Value },
    Answer { target_id: ConnectionId, payload: serde_json::Value },
    IceCandidate { target_id: ConnectionId, payload: serde_json::Value },
    UserMuted { muted: bool },
    UserVideoToggled { video_off: bool },
    RaiseHandToggled { raised: bool },
    Reaction { emoji: String },
    ChatMessage { message: serde_json::Value },
    Typing { is_typing: bool },
    HostMuteParticipant { participant_id: ConnectionId },
    HostToggleVideo { participant_id: ConnectionId },
    HostRemoveParticipant { participant_id: ConnectionId },
    HostTransfer { new_host_id: ConnectionId },
    RenameParticipant { participant_id: ConnectionId, new_name: String },
    Ping,
    ReconnectRequest,
    StartBreakoutRooms { rooms: serde_json::Value, duration: Option<u64> },
    EndBreakoutRooms,
    CreatePoll { poll: serde_json::Value },
    VotePoll { vote: serde_json::Value },
    EndPoll { poll_id: String },
    WhiteboardDraw { stroke: serde_json::Value },
    WhiteboardClear,
    ShareFile { file: serde_json::Value },
    DeleteFile { file_id: String },
    AskQuestion { question: serde_json::Value },
    UpvoteQuestion { question_id: String },
    AnswerQuestion { question_id: String, answer: serde_json::Value },
    ToggleMeetingLock { locked: bool },
    ToggleWaitingRoom { enabled: bool },
    ToggleScreenShareRestriction { restricted: bool },
    ToggleChatRestriction { restricted: bool },
    ScreenShareStarted,
    ScreenShareStopped,
    HostSpotlightParticipant { participant_id: ConnectionId },
    HostRemoveSpotlight,
    Error { message: String },
}

/// Participant view embedded in `user-joined`/`current-participants`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantView {
    pub id: ConnectionId,
    pub name: String,
    pub is_muted: bool,
    pub is_video_off: bool,
    pub is_host: bool,
    pub is_raise_hand: bool,
}

/// Participant + host-flag pair used in `host-changed` broadcasts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostFlag {
    pub id: ConnectionId,
    pub is_host: bool,
}

/// Events emitted to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerEvent {
    ConnectionConfirmed {
        socket_id: ConnectionId,
        timestamp: i64,
        server_time: i64,
        server_version: String,
        features: Vec<String>,
    },
    UserJoined(ParticipantView),
    CurrentParticipants { participants: Vec<ParticipantView> },
    ParticipantCount { count: usize },
    UserLeft { participant_id: ConnectionId, user_name: String, timestamp: i64, reason: String },
    UserMuted { participant_id: ConnectionId, muted: bool },
    UserVideoToggled { participant_id: ConnectionId, video_off: bool },
    RaiseHandToggled { participant_id: ConnectionId, raised: bool },
    ReactionReceived { participant_id: ConnectionId, user_name: String, emoji: String },
    ChatMessage { participant_id: ConnectionId, user_name: String, message: serde_json::Value },
    UserTyping { participant_id: ConnectionId, is_typing: bool },
    ParticipantForceMuted { participant_id: ConnectionId },
    ParticipantForceVideoToggle { participant_id: ConnectionId, video_off: bool },
    ForceDisconnect { reason: String, message: String },
    HostChanged {
        new_host_id: ConnectionId,
        new_host_name: String,
        previous_host_id: Option<ConnectionId>,
        participants: Vec<HostFlag>,
    },
    HostStatusUpdate { host_id: ConnectionId, host_name: String },
    ParticipantRenamed { participant_id: ConnectionId, new_name: String },
    Pong { timestamp: i64, server_load: f64, memory_usage: f64, latency_ms: Option<u64> },
    ReconnectResponse { success: bool, user_data: serde_json::Value, connection_health: serde_json::Value },
    ServerShutdown { message: String, timestamp: i64, recovery_data: serde_json::Value, expected_downtime: u64 },
    JoinError { message: String },
    ConnectionRecovery { message: String, timestamp: i64 },
    BreakoutRoomsCreated { rooms: serde_json::Value },
    BreakoutRoomsStarted { duration: u64 },
    AssignedToBreakoutRoom { room_id: String },
    BreakoutRoomsEnded,
    PollCreated { poll: serde_json::Value },
    PollVote { vote: serde_json::Value },
    PollEnded { poll_id: String },
    WhiteboardDraw { stroke: serde_json::Value },
    WhiteboardClear,
    FileShared { file: serde_json::Value },
    FileDeleted { file_id: String },
    QuestionAsked { question: serde_json::Value },
    QuestionUpvoted { question_id: String },
    QuestionAnswered { question_id: String, answer: serde_json::Value },
    MeetingLocked { locked: bool },
    WaitingRoomToggled { enabled: bool },
    ScreenShareRestricted { restricted: bool },
    ChatRestricted { restricted: bool },
    ScreenShareStarted { participant_id: ConnectionId },
    ScreenShareStopped { participant_id: ConnectionId },
    ParticipantSpotlighted { participant_id: ConnectionId },
    SpotlightRemoved { participant_id: ConnectionId },
    /// Peer-to-peer signaling relay: sender id is stamped by the router,
    /// never trusted from the client.
    Offer { sender_id: ConnectionId, payload: serde_json::Value },
    Answer { sender_id: ConnectionId, payload: serde_json::Value },
    IceCandidate { sender_id: ConnectionId, payload: serde_json::Value },
}

/// Current protocol/server version, surfaced in `connection-confirmed`.
pub const SERVER_VERSION: &str = "2.0.0";
