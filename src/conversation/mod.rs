//! Conversation Hub (C3, spec §4.3): inbound webhook intake, contact-info
//! mining, outbound send, and AI reply orchestration.

pub mod inbound;
pub mod mining;
pub mod outbound;
pub mod reply;
