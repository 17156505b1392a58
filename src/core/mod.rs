pub mod domain;
pub mod errors;
pub mod language;
pub mod pipeline;
pub mod projection;
pub mod sandbox;
pub mod traits;
pub mod workspace;
