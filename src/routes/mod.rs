// Route module decomposition — each domain area in its own file.

pub mod auth;
pub mod conversations;
pub mod import;
pub mod posting;
pub mod realtime;
pub mod system;
pub mod tenancy;
pub mod vehicles;
pub mod webhooks;
