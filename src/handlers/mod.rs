// Transcription Gateway HTTP handlers
//
// This module contains the HTTP handlers of the gateway. It provides the
// interface between HTTP requests and the shared speech model.

pub mod form;
pub mod routes;

#[cfg(test)]
mod tests;

use actix_web::web;

// Re-export handlers for easier access
pub use self::routes::{detect_language, health, transcribe, transcribe_stream};

/// Register every gateway route
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(transcribe)
        .service(transcribe_stream)
        .service(detect_language);
}
