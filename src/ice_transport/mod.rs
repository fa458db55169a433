pub mod ice_candidate;
pub mod ice_candidate_error;
pub mod ice_candidate_type;
pub mod ice_connection_state;
pub mod ice_gathering_state;
pub mod ice_protocol;
pub mod ice_server;
